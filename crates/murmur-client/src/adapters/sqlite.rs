//! SQLite-backed directory, message store and key storage.
//!
//! All three share one [`Database`] behind a mutex, the same way the desktop
//! state keeps its single connection.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use murmur_shared::keystore::KeyStorage;
use murmur_shared::{ConversationId, FileMessageRow, KeyStoreError, Profile, TextMessageRow, UserId};
use murmur_store::{Contact, Database, StoreError};

use crate::collaborators::{MessageStore, ProfileDirectory};
use crate::error::{ClientError, Result};

pub type SharedDatabase = Arc<Mutex<Database>>;

#[derive(Clone)]
pub struct SqliteBackend {
    db: SharedDatabase,
}

impl SqliteBackend {
    pub fn new(db: SharedDatabase) -> Self {
        Self { db }
    }

    fn db(&self) -> Result<MutexGuard<'_, Database>> {
        self.db.lock().map_err(|_| ClientError::DatabaseUnavailable)
    }
}

#[async_trait]
impl ProfileDirectory for SqliteBackend {
    async fn profile_by_id(&self, id: &UserId) -> Result<Option<Profile>> {
        Ok(self.db()?.get_profile_by_id(id)?)
    }

    async fn profile_by_username(&self, username: &str) -> Result<Option<Profile>> {
        Ok(self.db()?.get_profile_by_username(username)?)
    }

    async fn register(&self, profile: &Profile) -> Result<()> {
        self.db()?.upsert_profile(profile).map_err(|e| match e {
            StoreError::UsernameTaken(name) => ClientError::UsernameTaken(name),
            other => other.into(),
        })?;
        debug!(user = %profile.id, username = %profile.username, "Published profile");
        Ok(())
    }
}

#[async_trait]
impl MessageStore for SqliteBackend {
    async fn insert_text(&self, row: &TextMessageRow) -> Result<()> {
        Ok(self.db()?.insert_text_message(row)?)
    }

    async fn insert_file(&self, row: &FileMessageRow) -> Result<()> {
        Ok(self.db()?.insert_file_message(row)?)
    }

    async fn text_messages(&self, conversation_id: &ConversationId) -> Result<Vec<TextMessageRow>> {
        Ok(self.db()?.get_text_messages_for_conversation(conversation_id)?)
    }

    async fn file_messages(&self, conversation_id: &ConversationId) -> Result<Vec<FileMessageRow>> {
        Ok(self.db()?.get_file_messages_for_conversation(conversation_id)?)
    }

    async fn file_message(&self, id: Uuid) -> Result<Option<FileMessageRow>> {
        match self.db()?.get_file_message(id) {
            Ok(row) => Ok(Some(row)),
            Err(StoreError::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn upsert_contact(
        &self,
        owner: &UserId,
        peer: &UserId,
        last_message_at: DateTime<Utc>,
    ) -> Result<()> {
        Ok(self.db()?.upsert_contact(owner, peer, last_message_at)?)
    }

    async fn contacts(&self, owner: &UserId) -> Result<Vec<Contact>> {
        Ok(self.db()?.list_contacts(owner)?)
    }
}

/// Device key slot persisted in the `local_identity` table.
#[derive(Clone)]
pub struct SqliteKeyStorage {
    db: SharedDatabase,
}

impl SqliteKeyStorage {
    pub fn new(db: SharedDatabase) -> Self {
        Self { db }
    }

    fn with_db<T>(
        &self,
        f: impl FnOnce(&Database) -> std::result::Result<T, StoreError>,
    ) -> std::result::Result<T, KeyStoreError> {
        let db = self
            .db
            .lock()
            .map_err(|_| KeyStoreError::StorageUnavailable("database lock poisoned".into()))?;
        f(&db).map_err(|e| KeyStoreError::StorageUnavailable(e.to_string()))
    }
}

impl KeyStorage for SqliteKeyStorage {
    fn load(&self, slot: &str) -> std::result::Result<Option<String>, KeyStoreError> {
        self.with_db(|db| db.load_key_slot(slot))
    }

    fn save(&self, slot: &str, value: &str) -> std::result::Result<(), KeyStoreError> {
        self.with_db(|db| db.save_key_slot(slot, value))
    }

    fn remove(&self, slot: &str) -> std::result::Result<(), KeyStoreError> {
        self.with_db(|db| db.delete_key_slot(slot).map(|_| ()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_shared::keystore::IdentityKeyStore;

    fn shared_db() -> SharedDatabase {
        Arc::new(Mutex::new(Database::open_in_memory().unwrap()))
    }

    fn profile(id: &str, username: &str, key: &str) -> Profile {
        Profile {
            id: UserId::new(id),
            username: username.to_string(),
            public_key: key.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_and_refresh_key() {
        let backend = SqliteBackend::new(shared_db());
        backend.register(&profile("u1", "alice", "k1")).await.unwrap();
        backend.register(&profile("u1", "alice", "k2")).await.unwrap();

        let found = backend.profile_by_username("alice").await.unwrap().unwrap();
        assert_eq!(found.public_key, "k2");
    }

    #[tokio::test]
    async fn test_register_username_taken() {
        let backend = SqliteBackend::new(shared_db());
        backend.register(&profile("u1", "alice", "k1")).await.unwrap();
        assert!(matches!(
            backend.register(&profile("u2", "alice", "k2")).await,
            Err(ClientError::UsernameTaken(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_file_message_is_none() {
        let backend = SqliteBackend::new(shared_db());
        assert!(backend.file_message(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[test]
    fn test_identity_persists_across_stores() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("murmur.db");

        let first = {
            let db = Arc::new(Mutex::new(Database::open_at(&path).unwrap()));
            let store = IdentityKeyStore::new(SqliteKeyStorage::new(db));
            store.get_or_create_identity_keys().unwrap().public_key_bytes()
        };

        let db = Arc::new(Mutex::new(Database::open_at(&path).unwrap()));
        let store = IdentityKeyStore::new(SqliteKeyStorage::new(db));
        let second = store.get_identity_keys().unwrap().unwrap().public_key_bytes();
        assert_eq!(first, second);

        store.clear_identity_keys().unwrap();
        assert!(store.get_identity_keys().unwrap().is_none());
    }
}
