use std::{
    collections::{HashMap, HashSet},
    net::SocketAddr,
};

use tokio::sync::mpsc;
use tracing::debug;

use crate::message_log::MessageLog;

pub type SessionId = u64;

/// Outbound queue of one connection; the connection task writes it to the socket.
pub type Outbox = mpsc::UnboundedSender<String>;

#[derive(Debug)]
struct SessionEntry {
    remote_addr: SocketAddr,
    login: Option<String>,
    outbox: Outbox,
}

/// Shared chat state: connected sessions, reserved logins and the message log.
///
/// Callers serialize access (the server keeps it behind one mutex), so every
/// method runs to completion without interleaving.
#[derive(Debug, Default)]
pub struct Hub {
    sessions: HashMap<SessionId, SessionEntry>,
    used_logins: HashSet<String>,
    messages: MessageLog,
    next_id: SessionId,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, remote_addr: SocketAddr, outbox: Outbox) -> SessionId {
        self.next_id += 1;
        let id = self.next_id;
        self.sessions.insert(
            id,
            SessionEntry {
                remote_addr,
                login: None,
                outbox,
            },
        );
        id
    }

    /// Removes the session; calling it twice is harmless. Reserved logins stay reserved.
    pub fn unregister(&mut self, id: SessionId) -> bool {
        self.sessions.remove(&id).is_some()
    }

    /// Claims `login` if nobody ever claimed it before.
    pub fn reserve(&mut self, login: &str) -> bool {
        if self.used_logins.contains(login) {
            return false;
        }
        self.used_logins.insert(login.to_string());
        true
    }

    pub fn is_reserved(&self, login: &str) -> bool {
        self.used_logins.contains(login)
    }

    /// Records which login a registered session authenticated as.
    pub fn bind_login(&mut self, id: SessionId, login: &str) {
        if let Some(entry) = self.sessions.get_mut(&id) {
            entry.login = Some(login.to_string());
        }
    }

    pub fn broadcast(&self, line: &str) {
        for (id, entry) in &self.sessions {
            if entry.outbox.send(line.to_string()).is_err() {
                debug!(session = id, peer = %entry.remote_addr, "dropping line for closed session");
            }
        }
    }

    /// Sends `line` to one session only.
    pub fn send_to(&self, id: SessionId, line: &str) {
        if let Some(entry) = self.sessions.get(&id) {
            if entry.outbox.send(line.to_string()).is_err() {
                debug!(session = id, peer = %entry.remote_addr, "dropping line for closed session");
            }
        }
    }

    /// Logins of every authenticated session connected right now.
    pub fn connected_logins(&self) -> HashSet<String> {
        self.sessions
            .values()
            .filter_map(|entry| entry.login.clone())
            .collect()
    }

    pub fn append_message(&mut self, content: String, viewers: HashSet<String>) {
        self.messages.append(content, viewers);
    }

    /// Contents `login` has not seen yet; they count as seen afterwards.
    pub fn take_unread(&mut self, login: &str) -> Vec<String> {
        self.messages.take_unread(login)
    }

    pub fn messages(&self) -> &MessageLog {
        &self.messages
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn login_of(&self, id: SessionId) -> Option<&str> {
        self.sessions.get(&id).and_then(|entry| entry.login.as_deref())
    }
}
