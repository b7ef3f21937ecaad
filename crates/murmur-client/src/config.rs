//! Client configuration loaded from environment variables.
//!
//! Every setting has a default, so the CLI works with zero configuration.

use std::path::PathBuf;

use murmur_shared::constants::MAX_FILE_SIZE;
use murmur_store::Database;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Root directory for local state.
    /// Env: `MURMUR_DATA_DIR`
    /// Default: the platform data directory, or `./murmur-data`.
    pub data_dir: PathBuf,

    /// SQLite database file.
    /// Env: `MURMUR_DB_PATH`
    /// Default: `{data_dir}/murmur.db`
    pub db_path: PathBuf,

    /// Directory holding encrypted attachment bodies.
    /// Env: `MURMUR_BLOB_PATH`
    /// Default: `{data_dir}/blobs`
    pub blob_path: PathBuf,

    /// Largest attachment accepted for sending, in bytes.
    /// Env: `MURMUR_MAX_FILE_SIZE`
    /// Default: 50 MiB
    pub max_file_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let data_dir =
            Database::default_data_dir().unwrap_or_else(|_| PathBuf::from("./murmur-data"));
        Self::rooted_at(data_dir)
    }
}

impl ClientConfig {
    /// Defaults with every path placed under `data_dir`.
    pub fn rooted_at(data_dir: PathBuf) -> Self {
        Self {
            db_path: data_dir.join("murmur.db"),
            blob_path: data_dir.join("blobs"),
            data_dir,
            max_file_size: MAX_FILE_SIZE,
        }
    }

    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = match lookup("MURMUR_DATA_DIR") {
            Some(dir) if !dir.is_empty() => Self::rooted_at(PathBuf::from(dir)),
            _ => Self::default(),
        };

        if let Some(path) = lookup("MURMUR_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }

        if let Some(path) = lookup("MURMUR_BLOB_PATH") {
            config.blob_path = PathBuf::from(path);
        }

        if let Some(val) = lookup("MURMUR_MAX_FILE_SIZE") {
            match val.trim().parse::<usize>() {
                Ok(n) if n > 0 => config.max_file_size = n,
                _ => {
                    tracing::warn!(value = %val, "Invalid MURMUR_MAX_FILE_SIZE, using default");
                }
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_map(vars: &[(&str, &str)]) -> ClientConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ClientConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_data_dir_roots_other_paths() {
        let config = from_map(&[("MURMUR_DATA_DIR", "/tmp/mm")]);
        assert_eq!(config.db_path, PathBuf::from("/tmp/mm/murmur.db"));
        assert_eq!(config.blob_path, PathBuf::from("/tmp/mm/blobs"));
        assert_eq!(config.max_file_size, MAX_FILE_SIZE);
    }

    #[test]
    fn test_explicit_paths_win() {
        let config = from_map(&[
            ("MURMUR_DATA_DIR", "/tmp/mm"),
            ("MURMUR_DB_PATH", "/var/db.sqlite"),
            ("MURMUR_MAX_FILE_SIZE", "1024"),
        ]);
        assert_eq!(config.db_path, PathBuf::from("/var/db.sqlite"));
        assert_eq!(config.blob_path, PathBuf::from("/tmp/mm/blobs"));
        assert_eq!(config.max_file_size, 1024);
    }

    #[test]
    fn test_invalid_size_keeps_default() {
        let config = from_map(&[("MURMUR_DATA_DIR", "/tmp/mm"), ("MURMUR_MAX_FILE_SIZE", "lots")]);
        assert_eq!(config.max_file_size, MAX_FILE_SIZE);

        let config = from_map(&[("MURMUR_DATA_DIR", "/tmp/mm"), ("MURMUR_MAX_FILE_SIZE", "0")]);
        assert_eq!(config.max_file_size, MAX_FILE_SIZE);
    }
}
