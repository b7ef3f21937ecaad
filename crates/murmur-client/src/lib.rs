//! # murmur-client
//!
//! Messaging workflows on top of `murmur-shared` and `murmur-store`: the
//! async collaborator seams, their local adapters, the [`Messenger`] session
//! and the configuration used by the `murmur` binary.

pub mod adapters;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod messenger;
pub mod timeline;

use std::sync::{Arc, Mutex};

use tracing_subscriber::{fmt, EnvFilter};

use murmur_shared::constants::TAG_SIZE;
use murmur_shared::keystore::{IdentityKeyStore, KeyStorage};
use murmur_shared::UserId;
use murmur_store::{BlobDir, Database};

use crate::adapters::{RoomRelay, SharedDatabase, SqliteBackend, SqliteKeyStorage};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::messenger::{Collaborators, SharedKeyStore};

pub use error::ClientError;
pub use messenger::{Conversation, HistoryItem, Messenger, Readable};
pub use timeline::Timeline;

/// Install the global `tracing` subscriber (respects `RUST_LOG`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,murmur_client=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Open the local database named by `config`.
pub fn open_database(config: &ClientConfig) -> Result<SharedDatabase> {
    let db = Database::open_at(&config.db_path)?;
    Ok(Arc::new(Mutex::new(db)))
}

/// Device key provider backed by the local database.
pub fn local_key_store(db: &SharedDatabase) -> SharedKeyStore {
    let storage: Arc<dyn KeyStorage> = Arc::new(SqliteKeyStorage::new(db.clone()));
    Arc::new(IdentityKeyStore::new(storage))
}

/// Stored blobs carry the GCM tag on top of the file body.
fn blob_limit(max_file_size: usize) -> usize {
    max_file_size.saturating_add(TAG_SIZE)
}

/// A [`Messenger`] wired to the local database, blob directory and an
/// in-process relay.
pub async fn open_local(user_id: UserId, config: &ClientConfig) -> Result<Messenger> {
    let db = open_database(config)?;
    let backend = Arc::new(SqliteBackend::new(db.clone()));
    let blobs = BlobDir::new(config.blob_path.clone(), blob_limit(config.max_file_size)).await?;

    Ok(Messenger::new(
        user_id,
        local_key_store(&db),
        Collaborators {
            directory: backend.clone(),
            store: backend,
            blobs: Arc::new(blobs),
            relay: Arc::new(RoomRelay::new().connect()),
        },
        config.max_file_size,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_limit_allows_tag() {
        assert_eq!(blob_limit(1024), 1024 + TAG_SIZE);
        assert_eq!(blob_limit(usize::MAX - 3), usize::MAX);
    }
}
