//! Async seams between the messaging workflows and the outside world.
//!
//! Every collaborator only ever sees public keys, ciphertext and routing
//! metadata. Concrete implementations live in [`crate::adapters`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use uuid::Uuid;

use murmur_shared::protocol::{ClientEvent, ServerEvent};
use murmur_shared::{ConversationId, FileMessageRow, Profile, TextMessageRow, UserId};
use murmur_store::Contact;

use crate::error::Result;

/// Directory of published profiles; the only source of peer public keys.
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    async fn profile_by_id(&self, id: &UserId) -> Result<Option<Profile>>;

    async fn profile_by_username(&self, username: &str) -> Result<Option<Profile>>;

    /// Publish a profile, or update the username and key of an existing one.
    async fn register(&self, profile: &Profile) -> Result<()>;
}

/// Append-only message rows plus the per-user contact list.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn insert_text(&self, row: &TextMessageRow) -> Result<()>;

    async fn insert_file(&self, row: &FileMessageRow) -> Result<()>;

    async fn text_messages(&self, conversation_id: &ConversationId) -> Result<Vec<TextMessageRow>>;

    async fn file_messages(&self, conversation_id: &ConversationId) -> Result<Vec<FileMessageRow>>;

    async fn file_message(&self, id: Uuid) -> Result<Option<FileMessageRow>>;

    async fn upsert_contact(
        &self,
        owner: &UserId,
        peer: &UserId,
        last_message_at: DateTime<Utc>,
    ) -> Result<()>;

    async fn contacts(&self, owner: &UserId) -> Result<Vec<Contact>>;
}

/// Opaque storage for encrypted attachment bodies.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, locator: &str, bytes: &[u8]) -> Result<()>;

    async fn download(&self, locator: &str) -> Result<Vec<u8>>;
}

/// Live events scoped to one relay room.
pub type RoomEvents = BoxStream<'static, ServerEvent>;

/// Realtime fan-out of freshly inserted rows to room members.
#[async_trait]
pub trait Relay: Send + Sync {
    async fn join(&self, room: &str) -> Result<RoomEvents>;

    async fn publish(&self, event: ClientEvent) -> Result<()>;
}
