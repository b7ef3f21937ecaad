//! Device-local identity key store.
//!
//! [`IdentityKeyStore`] is the injectable key provider: it owns a
//! [`KeyStorage`] adapter and exposes the three identity operations
//! (`get`, `get_or_create`, `clear`). Creation runs behind a mutex so that
//! concurrent first use on a fresh device still yields exactly one keypair.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use tracing::{info, warn};

use crate::constants::IDENTITY_KEY_SLOT;
use crate::error::KeyStoreError;
use crate::identity::{IdentityKeys, StoredIdentity};

/// Pluggable device-local persistence for small string values.
pub trait KeyStorage: Send + Sync {
    fn load(&self, slot: &str) -> Result<Option<String>, KeyStoreError>;

    fn save(&self, slot: &str, value: &str) -> Result<(), KeyStoreError>;

    fn remove(&self, slot: &str) -> Result<(), KeyStoreError>;
}

impl<S: KeyStorage + ?Sized> KeyStorage for Arc<S> {
    fn load(&self, slot: &str) -> Result<Option<String>, KeyStoreError> {
        (**self).load(slot)
    }

    fn save(&self, slot: &str, value: &str) -> Result<(), KeyStoreError> {
        (**self).save(slot, value)
    }

    fn remove(&self, slot: &str) -> Result<(), KeyStoreError> {
        (**self).remove(slot)
    }
}

/// Volatile storage, used by tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryKeyStorage {
    slots: RwLock<HashMap<String, String>>,
}

impl MemoryKeyStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E>(_: E) -> KeyStoreError {
    KeyStoreError::StorageUnavailable("storage lock poisoned".into())
}

impl KeyStorage for MemoryKeyStorage {
    fn load(&self, slot: &str) -> Result<Option<String>, KeyStoreError> {
        let slots = self.slots.read().map_err(poisoned)?;
        Ok(slots.get(slot).cloned())
    }

    fn save(&self, slot: &str, value: &str) -> Result<(), KeyStoreError> {
        let mut slots = self.slots.write().map_err(poisoned)?;
        slots.insert(slot.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, slot: &str) -> Result<(), KeyStoreError> {
        let mut slots = self.slots.write().map_err(poisoned)?;
        slots.remove(slot);
        Ok(())
    }
}

pub struct IdentityKeyStore<S: KeyStorage> {
    storage: S,
    create_lock: Mutex<()>,
}

impl<S: KeyStorage> IdentityKeyStore<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            create_lock: Mutex::new(()),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Non-creating lookup.
    pub fn get_identity_keys(&self) -> Result<Option<IdentityKeys>, KeyStoreError> {
        let Some(raw) = self.storage.load(IDENTITY_KEY_SLOT)? else {
            return Ok(None);
        };
        let stored: StoredIdentity =
            serde_json::from_str(&raw).map_err(|e| KeyStoreError::Corrupt(e.to_string()))?;
        IdentityKeys::from_stored(&stored).map(Some)
    }

    /// Return the device keypair, generating and persisting one on first use.
    ///
    /// The keypair is written to storage before it is returned, so a caller
    /// never publishes a public key whose secret could be lost.
    pub fn get_or_create_identity_keys(&self) -> Result<IdentityKeys, KeyStoreError> {
        if let Some(keys) = self.get_identity_keys()? {
            return Ok(keys);
        }

        let _guard = self.create_lock.lock().map_err(poisoned)?;

        // Another caller may have won the race while we waited.
        if let Some(keys) = self.get_identity_keys()? {
            return Ok(keys);
        }

        let keys = IdentityKeys::generate();
        let json = serde_json::to_string(&keys.to_stored())
            .map_err(|e| KeyStoreError::StorageUnavailable(e.to_string()))?;
        self.storage.save(IDENTITY_KEY_SLOT, &json)?;

        info!(public_key = %keys.public_key_b64(), "Generated device identity keypair");
        Ok(keys)
    }

    /// Irreversibly delete the device keypair. Every ciphertext addressed to
    /// it becomes unreadable on this device.
    pub fn clear_identity_keys(&self) -> Result<(), KeyStoreError> {
        let _guard = self.create_lock.lock().map_err(poisoned)?;
        self.storage.remove(IDENTITY_KEY_SLOT)?;
        warn!("Device identity keypair wiped");
        Ok(())
    }
}
