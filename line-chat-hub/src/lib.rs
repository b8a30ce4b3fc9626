//! Line-oriented broadcast chat hub.
//!
//! Clients connect over TCP, claim a login with `[ + ] login:<name>`, and every
//! line they send afterwards is fanned out to all connected clients. A client
//! that logs in late is replayed the chat lines it has not seen yet.
//!
//! - [`cli`] parses the command-line interface for server and client modes.
//! - [`server`] accepts connections and runs one task per connection.
//! - [`session`] is the per-connection login/chat state machine.
//! - [`hub`] owns connected sessions, reserved logins and the message log.
//! - [`message_log`] records chat lines and which logins have seen them.
//! - [`protocol`] holds the wire lines plus async line framing helpers.
//! - [`client`] is a small terminal client.

pub mod cli;
pub mod client;
pub mod hub;
pub mod message_log;
pub mod protocol;
pub mod server;
pub mod session;
