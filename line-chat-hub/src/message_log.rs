use std::collections::HashSet;

/// A broadcast chat line and the logins that have already received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    content: String,
    seen_by: HashSet<String>,
}

impl Message {
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn seen_by(&self, login: &str) -> bool {
        self.seen_by.contains(login)
    }
}

/// Append-only record of chat lines in arrival order.
#[derive(Debug, Default)]
pub struct MessageLog {
    messages: Vec<Message>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, content: String, viewers: HashSet<String>) {
        self.messages.push(Message {
            content,
            seen_by: viewers,
        });
    }

    /// Returns the contents `login` has not seen yet, oldest first, and marks
    /// each of them as seen by `login`.
    pub fn take_unread(&mut self, login: &str) -> Vec<String> {
        self.messages
            .iter_mut()
            .filter(|message| !message.seen_by.contains(login))
            .map(|message| {
                message.seen_by.insert(login.to_string());
                message.content.clone()
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewers(logins: &[&str]) -> HashSet<String> {
        logins.iter().map(|login| login.to_string()).collect()
    }

    #[test]
    fn unread_keeps_arrival_order() {
        let mut log = MessageLog::new();
        log.append("alice: one".into(), viewers(&["alice"]));
        log.append("bob: two".into(), viewers(&["alice", "bob"]));
        log.append("alice: three".into(), viewers(&["alice"]));

        assert_eq!(log.take_unread("bob"), vec!["alice: one", "alice: three"]);
        assert_eq!(log.take_unread("carol"), vec!["alice: one", "bob: two", "alice: three"]);
    }

    #[test]
    fn delivered_messages_are_not_redelivered() {
        let mut log = MessageLog::new();
        log.append("alice: hi".into(), viewers(&["alice"]));

        assert_eq!(log.take_unread("bob"), vec!["alice: hi"]);
        assert!(log.take_unread("bob").is_empty());
        assert!(log.iter().all(|message| message.seen_by("bob")));
    }

    #[test]
    fn seen_marking_is_per_login() {
        let mut log = MessageLog::new();
        log.append("alice: hi".into(), HashSet::new());

        log.take_unread("bob");

        let message = log.iter().next().expect("one message");
        assert!(message.seen_by("bob"));
        assert!(!message.seen_by("carol"));
        assert_eq!(message.content(), "alice: hi");
        assert_eq!(log.len(), 1);
    }
}
