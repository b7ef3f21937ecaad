//! # murmur-shared
//!
//! The end-to-end encryption core of Murmur: device identity keys,
//! conversation addressing, the dual-copy message cipher, hybrid file
//! encryption, and the row and relay event shapes that carry their output.
//!
//! Everything here is synchronous and free of I/O apart from the pluggable
//! [`keystore::KeyStorage`] adapter.

pub mod cipher;
pub mod constants;
pub mod conversation;
pub mod encoding;
pub mod error;
pub mod file_cipher;
pub mod identity;
pub mod keystore;
pub mod protocol;
pub mod types;

pub use conversation::{conversation_key_for, ConversationId};
pub use error::{CryptoError, KeyStoreError};
pub use identity::IdentityKeys;
pub use protocol::{FileMessageRow, Message, TextMessageRow};
pub use types::{Profile, ReaderRole, UserId};
