//! Filesystem blob store for encrypted attachment bodies.
//!
//! Blobs are addressed by a storage locator of the form
//! `"{conversation_id}/{name}"` and written once: an existing locator is never
//! overwritten. Only ciphertext is ever handed to this store.

use std::path::{Component, Path, PathBuf};

use chrono::Utc;
use rand::Rng;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use murmur_shared::ConversationId;

use crate::error::{Result, StoreError};

/// Build a fresh storage locator for an attachment:
/// `"{conversation_id}/{unix_millis}_{random}_{sanitized_file_name}"`.
pub fn storage_locator(conversation_id: &ConversationId, file_name: &str) -> String {
    let millis = Utc::now().timestamp_millis();
    let random = to_base36(rand::thread_rng().gen::<u32>());
    format!(
        "{}/{}_{}_{}",
        conversation_id,
        millis,
        random,
        sanitize_file_name(file_name)
    )
}

/// Keep `[A-Za-z0-9_.-]`, replace everything else with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    // A bare "." or ".." must not survive as a path component.
    if cleaned.chars().all(|c| c == '.') {
        cleaned.replace('.', "_")
    } else {
        cleaned
    }
}

fn to_base36(mut n: u32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// Resolve a locator below `base`, rejecting anything but plain
/// `dir/file` relative paths.
fn resolve_locator(base: &Path, locator: &str) -> Result<PathBuf> {
    let relative = Path::new(locator);
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(c) => parts.push(c),
            _ => return Err(StoreError::InvalidLocator(locator.to_string())),
        }
    }
    if parts.len() != 2 || locator.contains('\\') {
        return Err(StoreError::InvalidLocator(locator.to_string()));
    }

    let mut resolved = base.to_path_buf();
    for part in parts {
        resolved.push(part);
    }
    Ok(resolved)
}

#[derive(Debug, Clone)]
pub struct BlobDir {
    base_path: PathBuf,
    max_size: usize,
}

impl BlobDir {
    pub async fn new(base_path: PathBuf, max_size: usize) -> Result<Self> {
        fs::create_dir_all(&base_path).await?;

        info!(path = %base_path.display(), "Blob directory initialized");

        Ok(Self {
            base_path,
            max_size,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Store a blob under `locator`. Fails if the locator is already taken.
    pub async fn put(&self, locator: &str, data: &[u8]) -> Result<()> {
        if data.len() > self.max_size {
            return Err(StoreError::BlobTooLarge {
                size: data.len(),
                max: self.max_size,
            });
        }

        let path = resolve_locator(&self.base_path, locator)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(StoreError::BlobExists(locator.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        if let Err(e) = write_all_synced(&mut file, data).await {
            // Do not leave a truncated blob behind.
            let _ = fs::remove_file(&path).await;
            return Err(e.into());
        }

        debug!(locator, size = data.len(), "Stored blob");
        Ok(())
    }

    pub async fn get(&self, locator: &str) -> Result<Vec<u8>> {
        let path = resolve_locator(&self.base_path, locator)?;

        let data = match fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::BlobNotFound(locator.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        debug!(locator, size = data.len(), "Retrieved blob");
        Ok(data)
    }
}

async fn write_all_synced(file: &mut fs::File, data: &[u8]) -> std::io::Result<()> {
    file.write_all(data).await?;
    file.sync_all().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_shared::conversation_key_for;
    use tempfile::TempDir;

    async fn test_store() -> (BlobDir, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = BlobDir::new(dir.path().to_path_buf(), 1024 * 1024)
            .await
            .unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let (store, _dir) = test_store().await;
        let locator = storage_locator(&conversation_key_for("u1", "u2"), "report.pdf");

        store.put(&locator, b"encrypted-blob-data").await.unwrap();
        assert_eq!(store.get(&locator).await.unwrap(), b"encrypted-blob-data");
    }

    #[tokio::test]
    async fn test_no_overwrite() {
        let (store, _dir) = test_store().await;
        store.put("conv/a.bin", b"first").await.unwrap();
        assert!(matches!(
            store.put("conv/a.bin", b"second").await,
            Err(StoreError::BlobExists(_))
        ));
        assert_eq!(store.get("conv/a.bin").await.unwrap(), b"first");
    }

    #[tokio::test]
    async fn test_missing_blob_not_found() {
        let (store, _dir) = test_store().await;
        assert!(matches!(
            store.get("conv/missing.bin").await,
            Err(StoreError::BlobNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_traversal_rejected() {
        let (store, _dir) = test_store().await;
        for bad in ["../escape.bin", "conv/../../x", "/etc/passwd", "flat.bin", "a/b/c"] {
            assert!(
                matches!(store.put(bad, b"x").await, Err(StoreError::InvalidLocator(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_size_limit() {
        let dir = TempDir::new().unwrap();
        let store = BlobDir::new(dir.path().to_path_buf(), 4).await.unwrap();
        assert!(matches!(
            store.put("conv/big.bin", b"too big").await,
            Err(StoreError::BlobTooLarge { size: 7, max: 4 })
        ));
    }

    #[test]
    fn test_locator_shape() {
        let conv = conversation_key_for("u1", "u2");
        let locator = storage_locator(&conv, "my photo (1).jpg");
        let (dir, name) = locator.split_once('/').unwrap();
        assert_eq!(dir, conv.as_str());
        assert!(name.ends_with("_my_photo__1_.jpg"));
        assert_eq!(name.split('_').count() >= 3, true);
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize_file_name("a/b\\c.txt"), "a_b_c.txt");
        assert_eq!(sanitize_file_name(".."), "__");
        assert_eq!(sanitize_file_name("résumé.pdf"), "r_sum_.pdf");
    }

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }
}
