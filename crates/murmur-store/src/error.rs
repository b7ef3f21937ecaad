use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A query expected exactly one row but found none.
    #[error("Record not found")]
    NotFound,

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Username already taken: {0}")]
    UsernameTaken(String),

    #[error("Blob already exists: {0}")]
    BlobExists(String),

    #[error("Blob not found: {0}")]
    BlobNotFound(String),

    #[error("Blob too large: {size} bytes (max {max})")]
    BlobTooLarge { size: usize, max: usize },

    /// Rejected storage locator (traversal or malformed).
    #[error("Invalid storage locator: {0}")]
    InvalidLocator(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
