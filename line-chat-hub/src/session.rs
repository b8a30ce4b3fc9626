//! Per-connection protocol state.
//!
//! [`LineSession`] never touches the socket. It reacts to connection events and
//! inbound lines by mutating the [`Hub`] and queueing outbound lines there; the
//! server task owns the I/O and the deferred-close timer.

use std::net::SocketAddr;

use tracing::info;

use crate::{
    hub::{Hub, Outbox, SessionId},
    protocol::{Notice, parse_login},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginRejection {
    Busy { login: String },
    Invalid,
}

/// What the connection should do after a line was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Continue,
    /// Authentication succeeded; any pending close must be cancelled.
    Authenticated,
    /// Close the connection once the grace delay elapses.
    CloseAfterGrace(LoginRejection),
}

#[derive(Debug)]
pub struct LineSession {
    id: SessionId,
    remote_addr: SocketAddr,
    login: Option<String>,
    state: SessionState,
}

impl LineSession {
    /// Registers the connection with the hub and greets it.
    pub fn connect(hub: &mut Hub, remote_addr: SocketAddr, outbox: Outbox) -> Self {
        let id = hub.register(remote_addr, outbox);
        hub.send_to(id, &Notice::Welcome.to_string());
        info!(peer = %remote_addr, "client connected");

        Self {
            id,
            remote_addr,
            login: None,
            state: SessionState::Unauthenticated,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    pub fn login(&self) -> Option<&str> {
        self.login.as_deref()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn handle_line(&mut self, hub: &mut Hub, line: &str) -> Step {
        match self.state {
            SessionState::Unauthenticated => self.authenticate(hub, line),
            SessionState::Authenticated => {
                self.chat(hub, line);
                Step::Continue
            }
            SessionState::Closed => Step::Continue,
        }
    }

    /// Leaves the hub. Safe to call more than once.
    pub fn disconnect(&mut self, hub: &mut Hub) {
        if self.state == SessionState::Closed {
            return;
        }
        hub.unregister(self.id);
        self.state = SessionState::Closed;
        info!(peer = %self.remote_addr, login = self.login.as_deref(), "client disconnected");
    }

    fn authenticate(&mut self, hub: &mut Hub, line: &str) -> Step {
        let Some(candidate) = parse_login(line) else {
            hub.send_to(self.id, &Notice::InvalidLogin.to_string());
            info!(peer = %self.remote_addr, "rejected malformed login line");
            return Step::CloseAfterGrace(LoginRejection::Invalid);
        };

        if !hub.reserve(candidate) {
            let notice = Notice::LoginBusy {
                login: candidate.to_string(),
            };
            hub.send_to(self.id, &notice.to_string());
            info!(peer = %self.remote_addr, login = candidate, "rejected busy login");
            return Step::CloseAfterGrace(LoginRejection::Busy {
                login: candidate.to_string(),
            });
        }

        hub.bind_login(self.id, candidate);
        self.login = Some(candidate.to_string());
        self.state = SessionState::Authenticated;
        info!(peer = %self.remote_addr, login = candidate, "client logged in");

        hub.broadcast(
            &Notice::NewUser {
                login: candidate.to_string(),
            }
            .to_string(),
        );
        self.deliver_history(hub, candidate);

        Step::Authenticated
    }

    fn deliver_history(&self, hub: &mut Hub, login: &str) {
        let unread = hub.take_unread(login);
        if unread.is_empty() {
            hub.send_to(self.id, &Notice::NothingUnread.to_string());
            return;
        }

        hub.send_to(
            self.id,
            &Notice::UnreadCount {
                count: unread.len(),
            }
            .to_string(),
        );
        for content in unread {
            hub.send_to(self.id, &Notice::Unread { content }.to_string());
        }
    }

    fn chat(&self, hub: &mut Hub, text: &str) {
        let Some(login) = self.login.as_deref() else {
            return;
        };

        let line = Notice::Chat {
            login: login.to_string(),
            text: text.to_string(),
        }
        .to_string();
        info!("{line}");

        hub.broadcast(&line);
        let viewers = hub.connected_logins();
        hub.append_message(line, viewers);
    }
}
