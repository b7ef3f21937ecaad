use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Encryption failed")]
    EncryptionFailed,

    /// A text payload (or wrapped key) could not be opened by this reader.
    #[error("Decryption failed: invalid ciphertext or wrong key")]
    DecryptionFailed,

    /// AEAD tag mismatch on a file body: tampering, wrong key or wrong IV.
    #[error("Authentication failed: file ciphertext does not verify")]
    AuthenticationFailure,

    #[error("Invalid key length")]
    InvalidKeyLength,

    #[error("Invalid base64 encoding")]
    InvalidEncoding,

    /// X25519 agreement produced the all-zero point.
    #[error("Key agreement rejected: non-contributory public key")]
    WeakPublicKey,
}

#[derive(Error, Debug)]
pub enum KeyStoreError {
    #[error("Key storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Stored identity is corrupt: {0}")]
    Corrupt(String),
}
