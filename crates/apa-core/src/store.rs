//! Ordered, client-side message store.

use crate::types::{Message, MessageId, Role};

/// Holds the conversation in display order.
///
/// Messages are appended and edited in place, never removed. Every effective
/// mutation bumps [`revision`](MessageStore::revision) so renderers can tell
/// when to redraw.
#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
    revision: u64,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `message` and return its id.
    pub fn append(&mut self, message: Message) -> MessageId {
        let id = message.id.clone();
        self.messages.push(message);
        self.touch();
        id
    }

    /// Replace the content of `id` with the trimmed `new_content`.
    ///
    /// Returns `false` without touching the store when the id is unknown or
    /// the new content is blank.
    pub fn edit(&mut self, id: &MessageId, new_content: &str) -> bool {
        let trimmed = new_content.trim();
        if trimmed.is_empty() {
            return false;
        }
        let Some(message) = self.messages.iter_mut().find(|m| &m.id == id) else {
            return false;
        };
        message.content = trimmed.to_owned();
        self.touch();
        true
    }

    /// The last `n` messages in their original order (fewer if the store
    /// holds fewer).
    pub fn trailing_window(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    /// Message at a zero-based display position.
    pub fn nth(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn has_user_message(&self) -> bool {
        self.messages.iter().any(|m| m.role == Role::User)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}
