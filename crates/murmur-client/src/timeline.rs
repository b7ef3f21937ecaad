//! Ordered view of one conversation: loaded history plus live deliveries.

use std::collections::HashSet;

use uuid::Uuid;

use murmur_shared::protocol::ServerEvent;
use murmur_shared::{ConversationId, Message};

#[derive(Debug)]
pub struct Timeline {
    conversation_id: ConversationId,
    seen: HashSet<Uuid>,
    messages: Vec<Message>,
    peer_typing: bool,
}

impl Timeline {
    pub fn new(conversation_id: ConversationId) -> Self {
        Self {
            conversation_id,
            seen: HashSet::new(),
            messages: Vec::new(),
            peer_typing: false,
        }
    }

    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    /// Append a message if it belongs here and has not been seen.
    /// Returns whether it was added.
    pub fn push(&mut self, message: Message) -> bool {
        if message.conversation_id() != &self.conversation_id {
            return false;
        }
        if !self.seen.insert(message.id()) {
            return false;
        }
        self.messages.push(message);
        true
    }

    pub fn extend(&mut self, messages: impl IntoIterator<Item = Message>) {
        for message in messages {
            self.push(message);
        }
    }

    /// Apply one relay delivery. Returns the message if it was appended.
    pub fn apply(&mut self, event: ServerEvent) -> Option<&Message> {
        match event {
            ServerEvent::Typing { state } => {
                self.peer_typing = state;
                None
            }
            other => {
                let message = other.into_message()?;
                if self.push(message) {
                    self.messages.last()
                } else {
                    None
                }
            }
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn peer_typing(&self) -> bool {
        self.peer_typing
    }
}
