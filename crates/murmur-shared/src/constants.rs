/// XChaCha20-Poly1305 nonce size in bytes (one box nonce)
pub const BOX_NONCE_SIZE: usize = 24;

/// Poly1305 / GCM authentication tag size in bytes
pub const TAG_SIZE: usize = 16;

/// X25519 public key size in bytes
pub const PUBLIC_KEY_SIZE: usize = 32;

/// X25519 secret key size in bytes
pub const SECRET_KEY_SIZE: usize = 32;

/// AES-256-GCM content key size in bytes
pub const CONTENT_KEY_SIZE: usize = 32;

/// AES-GCM initialization vector size in bytes (96 bits)
pub const FILE_IV_SIZE: usize = 12;

/// Maximum file attachment size in bytes (50 MiB)
pub const MAX_FILE_SIZE: usize = 50 * 1024 * 1024;

/// Separator placed between the two sorted identities before hashing
pub const CONVERSATION_SEPARATOR: &str = ":";

/// MIME type used when a file message does not declare one
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Storage slot holding the device identity keypair
pub const IDENTITY_KEY_SLOT: &str = "e2ee_identity_keys_v1";

/// Key derivation contexts (BLAKE3)
pub const KDF_CONTEXT_BOX_KEY: &str = "murmur-box-key-v1";
