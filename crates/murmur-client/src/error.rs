use thiserror::Error;

use murmur_shared::{CryptoError, KeyStoreError};
use murmur_store::StoreError;

/// Errors surfaced by the messaging workflows.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The device keypair could not be read or written.
    #[error("Key storage: {0}")]
    KeyStore(#[from] KeyStoreError),

    #[error("Recipient not found: {0}")]
    RecipientNotFound(String),

    #[error("Cannot open a conversation with yourself")]
    SelfConversation,

    /// The local user has not published a profile yet.
    #[error("No profile registered for {0}")]
    ProfileMissing(String),

    #[error("Username already taken: {0}")]
    UsernameTaken(String),

    #[error("Invalid username")]
    InvalidUsername,

    #[error("Message is empty")]
    EmptyMessage,

    #[error("File too large: {size} bytes (max {max})")]
    FileTooLarge { size: usize, max: usize },

    /// Blob upload failed; no metadata row was written.
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Failed to persist message: {0}")]
    PersistFailed(String),

    /// The wrapped content key of a file could not be opened by this reader.
    #[error("File key unavailable")]
    FileKeyUnavailable,

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Not a participant of this message")]
    NotParticipant,

    #[error("Message not found: {0}")]
    MessageNotFound(String),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Local database unavailable")]
    DatabaseUnavailable,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Relay error: {0}")]
    Relay(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;
