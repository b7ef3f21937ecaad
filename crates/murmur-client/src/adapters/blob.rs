use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use murmur_store::{BlobDir, StoreError};

use crate::collaborators::BlobStore;
use crate::error::{ClientError, Result};

#[async_trait]
impl BlobStore for BlobDir {
    async fn upload(&self, locator: &str, bytes: &[u8]) -> Result<()> {
        Ok(self.put(locator, bytes).await?)
    }

    async fn download(&self, locator: &str) -> Result<Vec<u8>> {
        Ok(self.get(locator).await?)
    }
}

/// In-process blob store with the same no-overwrite rule as [`BlobDir`].
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.read().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Overwrite a stored blob in place. Lets tests simulate tampering at rest.
    pub fn replace(&self, locator: &str, bytes: Vec<u8>) -> Result<()> {
        let mut blobs = self.blobs.write().map_err(|_| ClientError::DatabaseUnavailable)?;
        match blobs.get_mut(locator) {
            Some(slot) => {
                *slot = bytes;
                Ok(())
            }
            None => Err(StoreError::BlobNotFound(locator.to_string()).into()),
        }
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, locator: &str, bytes: &[u8]) -> Result<()> {
        let mut blobs = self.blobs.write().map_err(|_| ClientError::DatabaseUnavailable)?;
        if blobs.contains_key(locator) {
            return Err(StoreError::BlobExists(locator.to_string()).into());
        }
        blobs.insert(locator.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn download(&self, locator: &str) -> Result<Vec<u8>> {
        let blobs = self.blobs.read().map_err(|_| ClientError::DatabaseUnavailable)?;
        blobs
            .get(locator)
            .cloned()
            .ok_or_else(|| StoreError::BlobNotFound(locator.to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_no_overwrite() {
        let store = MemoryBlobStore::new();
        store.upload("c/a", b"one").await.unwrap();
        assert!(store.upload("c/a", b"two").await.is_err());
        assert_eq!(store.download("c/a").await.unwrap(), b"one");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_blob_dir_adapter() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = BlobDir::new(dir.path().to_path_buf(), 1024).await.unwrap();
        BlobStore::upload(&blobs, "c/a", b"cipher").await.unwrap();
        assert_eq!(BlobStore::download(&blobs, "c/a").await.unwrap(), b"cipher");
        assert!(matches!(
            BlobStore::download(&blobs, "c/missing").await,
            Err(ClientError::Store(StoreError::BlobNotFound(_)))
        ));
    }
}
