use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cipher::{DualBox, WireBox};
use crate::conversation::ConversationId;
use crate::types::{ReaderRole, UserId};

/// Rows are stored with microsecond timestamps; truncate so a fresh row
/// equals its persisted form.
fn row_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// A persisted text message. Both slots carry the same plaintext, one
/// readable by the recipient and one by the sender.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextMessageRow {
    pub id: Uuid,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub recipient_id: UserId,
    /// Embedded so any reader can open the row without a directory lookup
    pub sender_public_key: String,
    pub ciphertext_to_recipient: String,
    pub nonce_to_recipient: String,
    pub ciphertext_to_sender: String,
    pub nonce_to_sender: String,
    pub created_at: DateTime<Utc>,
}

impl TextMessageRow {
    pub fn new(
        conversation_id: ConversationId,
        sender_id: UserId,
        recipient_id: UserId,
        sender_public_key: String,
        sealed: DualBox,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id,
            recipient_id,
            sender_public_key,
            ciphertext_to_recipient: sealed.to_recipient.ciphertext,
            nonce_to_recipient: sealed.to_recipient.nonce,
            ciphertext_to_sender: sealed.to_sender.ciphertext,
            nonce_to_sender: sealed.to_sender.nonce,
            created_at: row_timestamp(),
        }
    }

    pub fn slot(&self, role: ReaderRole) -> WireBox {
        match role {
            ReaderRole::Recipient => WireBox {
                ciphertext: self.ciphertext_to_recipient.clone(),
                nonce: self.nonce_to_recipient.clone(),
            },
            ReaderRole::Sender => WireBox {
                ciphertext: self.ciphertext_to_sender.clone(),
                nonce: self.nonce_to_sender.clone(),
            },
        }
    }
}

/// Metadata for an encrypted attachment whose body lives in the blob store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileMessageRow {
    pub id: Uuid,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub recipient_id: UserId,
    pub sender_public_key: String,
    pub storage_locator: String,
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    /// Base64 AES-GCM IV
    pub iv: String,
    pub wrapped_key_to_recipient: String,
    pub wrap_nonce_to_recipient: String,
    pub wrapped_key_to_sender: String,
    pub wrap_nonce_to_sender: String,
    pub created_at: DateTime<Utc>,
}

/// Everything needed to build a [`FileMessageRow`] besides the routing fields.
#[derive(Debug, Clone)]
pub struct FileDescriptor {
    pub storage_locator: String,
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub iv: String,
    pub wrapped_key: DualBox,
}

impl FileMessageRow {
    pub fn new(
        conversation_id: ConversationId,
        sender_id: UserId,
        recipient_id: UserId,
        sender_public_key: String,
        file: FileDescriptor,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id,
            recipient_id,
            sender_public_key,
            storage_locator: file.storage_locator,
            file_name: file.file_name,
            mime_type: file.mime_type,
            size_bytes: file.size_bytes,
            iv: file.iv,
            wrapped_key_to_recipient: file.wrapped_key.to_recipient.ciphertext,
            wrap_nonce_to_recipient: file.wrapped_key.to_recipient.nonce,
            wrapped_key_to_sender: file.wrapped_key.to_sender.ciphertext,
            wrap_nonce_to_sender: file.wrapped_key.to_sender.nonce,
            created_at: row_timestamp(),
        }
    }

    pub fn wrapped_key(&self, role: ReaderRole) -> WireBox {
        match role {
            ReaderRole::Recipient => WireBox {
                ciphertext: self.wrapped_key_to_recipient.clone(),
                nonce: self.wrap_nonce_to_recipient.clone(),
            },
            ReaderRole::Sender => WireBox {
                ciphertext: self.wrapped_key_to_sender.clone(),
                nonce: self.wrap_nonce_to_sender.clone(),
            },
        }
    }
}

/// Any row of a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    Text(TextMessageRow),
    File(FileMessageRow),
}

impl Message {
    pub fn id(&self) -> Uuid {
        match self {
            Message::Text(row) => row.id,
            Message::File(row) => row.id,
        }
    }

    pub fn conversation_id(&self) -> &ConversationId {
        match self {
            Message::Text(row) => &row.conversation_id,
            Message::File(row) => &row.conversation_id,
        }
    }

    pub fn sender_id(&self) -> &UserId {
        match self {
            Message::Text(row) => &row.sender_id,
            Message::File(row) => &row.sender_id,
        }
    }

    pub fn recipient_id(&self) -> &UserId {
        match self {
            Message::Text(row) => &row.recipient_id,
            Message::File(row) => &row.recipient_id,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Message::Text(row) => row.created_at,
            Message::File(row) => row.created_at,
        }
    }
}

/// Events a client sends to the realtime relay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ClientEvent {
    #[serde(rename = "join")]
    Join { room: String },

    #[serde(rename = "message:send")]
    MessageSend { room: String, row: TextMessageRow },

    #[serde(rename = "file:send")]
    FileSend { room: String, row: FileMessageRow },

    #[serde(rename = "typing")]
    Typing { room: String, state: bool },
}

/// Events the relay fans out to room members.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ServerEvent {
    #[serde(rename = "message:new")]
    MessageNew { row: TextMessageRow },

    #[serde(rename = "file:new")]
    FileNew { row: FileMessageRow },

    #[serde(rename = "typing")]
    Typing { state: bool },
}

/// Who in a room receives a broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Everyone,
    OthersOnly,
}

impl ClientEvent {
    /// Map a publish event to the room and event the relay broadcasts.
    /// `join` and events with an empty room name produce nothing.
    pub fn into_broadcast(self) -> Option<(String, ServerEvent, Audience)> {
        let (room, event, audience) = match self {
            ClientEvent::Join { .. } => return None,
            ClientEvent::MessageSend { room, row } => {
                (room, ServerEvent::MessageNew { row }, Audience::Everyone)
            }
            ClientEvent::FileSend { room, row } => {
                (room, ServerEvent::FileNew { row }, Audience::Everyone)
            }
            ClientEvent::Typing { room, state } => {
                (room, ServerEvent::Typing { state }, Audience::OthersOnly)
            }
        };
        if room.is_empty() {
            return None;
        }
        Some((room, event, audience))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }
}

impl ServerEvent {
    pub fn into_message(self) -> Option<Message> {
        match self {
            ServerEvent::MessageNew { row } => Some(Message::Text(row)),
            ServerEvent::FileNew { row } => Some(Message::File(row)),
            ServerEvent::Typing { .. } => None,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::encrypt_dual;
    use crate::conversation::conversation_key_for;
    use crate::identity::IdentityKeys;

    fn sample_row() -> TextMessageRow {
        let alice = IdentityKeys::generate();
        let bob = IdentityKeys::generate();
        let sealed = encrypt_dual("hi", bob.public_key(), &alice).unwrap();
        TextMessageRow::new(
            conversation_key_for("alice", "bob"),
            UserId::new("alice"),
            UserId::new("bob"),
            alice.public_key_b64(),
            sealed,
        )
    }

    #[test]
    fn test_slot_selection() {
        let row = sample_row();
        assert_eq!(row.slot(ReaderRole::Recipient).ciphertext, row.ciphertext_to_recipient);
        assert_eq!(row.slot(ReaderRole::Sender).nonce, row.nonce_to_sender);
    }

    #[test]
    fn test_created_at_has_storage_precision() {
        let row = sample_row();
        assert_eq!(row.created_at.timestamp_subsec_nanos() % 1_000, 0);
    }

    #[test]
    fn test_client_event_names() {
        let row = sample_row();
        let event = ClientEvent::MessageSend {
            room: row.conversation_id.0.clone(),
            row,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "message:send");

        let decoded = ClientEvent::from_bytes(&event.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn test_message_send_broadcasts_message_new() {
        let row = sample_row();
        let room = row.conversation_id.0.clone();
        let (to_room, event, audience) = ClientEvent::MessageSend {
            room: room.clone(),
            row: row.clone(),
        }
        .into_broadcast()
        .unwrap();

        assert_eq!(to_room, room);
        assert_eq!(audience, Audience::Everyone);
        assert_eq!(serde_json::to_value(&event).unwrap()["event"], "message:new");
        assert_eq!(event.into_message(), Some(Message::Text(row)));
    }

    #[test]
    fn test_join_and_empty_room_not_broadcast() {
        assert!(ClientEvent::Join { room: "r".into() }.into_broadcast().is_none());
        assert!(ClientEvent::Typing {
            room: String::new(),
            state: true
        }
        .into_broadcast()
        .is_none());
    }

    #[test]
    fn test_typing_goes_to_others_only() {
        let (_, event, audience) = ClientEvent::Typing {
            room: "r".into(),
            state: true,
        }
        .into_broadcast()
        .unwrap();
        assert_eq!(audience, Audience::OthersOnly);
        assert!(event.into_message().is_none());
    }

    #[test]
    fn test_message_union_tagged() {
        let msg = Message::Text(sample_row());
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["sender_id"], "alice");
    }
}
