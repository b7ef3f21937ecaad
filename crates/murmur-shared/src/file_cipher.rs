//! Hybrid encryption for file attachments.
//!
//! File bodies are sealed with AES-256-GCM under a fresh random content key
//! and 96-bit IV (16-byte tag appended). The content key is then wrapped
//! through the message cipher twice, once per reader, exactly like a text body.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::cipher::{decrypt_wire, encrypt_dual, DualBox, WireBox};
use crate::constants::{CONTENT_KEY_SIZE, DEFAULT_MIME_TYPE, FILE_IV_SIZE};
use crate::encoding::{from_base64_array, to_base64};
use crate::error::CryptoError;
use crate::identity::IdentityKeys;

/// Raw AES-256-GCM content key. Zeroized on drop; never persisted as-is.
#[derive(Clone)]
pub struct ContentKey(Zeroizing<[u8; CONTENT_KEY_SIZE]>);

impl ContentKey {
    pub fn generate() -> Self {
        let mut key = Zeroizing::new([0u8; CONTENT_KEY_SIZE]);
        rand::rngs::OsRng.fill_bytes(&mut *key);
        Self(key)
    }

    pub fn from_bytes(bytes: [u8; CONTENT_KEY_SIZE]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; CONTENT_KEY_SIZE] {
        &self.0
    }

    fn to_base64(&self) -> Zeroizing<String> {
        Zeroizing::new(to_base64(&self.0[..]))
    }
}

impl std::fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ContentKey(<redacted>)")
    }
}

/// Output of [`encrypt_file_for_upload`].
#[derive(Debug)]
pub struct EncryptedFile {
    /// Ciphertext with the GCM tag appended; uploaded as an opaque blob.
    pub cipher_blob: Vec<u8>,
    pub iv: [u8; FILE_IV_SIZE],
    /// Must be wrapped with [`wrap_content_key`] and then dropped.
    pub content_key: ContentKey,
}

impl EncryptedFile {
    pub fn iv_b64(&self) -> String {
        to_base64(&self.iv)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedFile {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

pub fn generate_iv() -> [u8; FILE_IV_SIZE] {
    let mut iv = [0u8; FILE_IV_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut iv);
    iv
}

pub fn encrypt_file_for_upload(bytes: &[u8]) -> Result<EncryptedFile, CryptoError> {
    let content_key = ContentKey::generate();
    let iv = generate_iv();

    let cipher = Aes256Gcm::new(content_key.as_bytes().into());
    let cipher_blob = cipher
        .encrypt(Nonce::from_slice(&iv), bytes)
        .map_err(|_| CryptoError::EncryptionFailed)?;

    Ok(EncryptedFile {
        cipher_blob,
        iv,
        content_key,
    })
}

/// Decrypt a downloaded blob. A tag mismatch yields
/// [`CryptoError::AuthenticationFailure`] and no plaintext at all.
pub fn decrypt_file_from_bytes(
    cipher_bytes: &[u8],
    iv: &[u8],
    content_key: &ContentKey,
    mime_type: Option<&str>,
) -> Result<DecryptedFile, CryptoError> {
    if iv.len() != FILE_IV_SIZE {
        return Err(CryptoError::AuthenticationFailure);
    }

    let cipher = Aes256Gcm::new(content_key.as_bytes().into());
    let bytes = cipher
        .decrypt(Nonce::from_slice(iv), cipher_bytes)
        .map_err(|_| CryptoError::AuthenticationFailure)?;

    let mime_type = mime_type
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(DEFAULT_MIME_TYPE)
        .to_string();

    Ok(DecryptedFile { bytes, mime_type })
}

/// Wrap a content key for the recipient and for the sender.
pub fn wrap_content_key(
    content_key: &ContentKey,
    recipient_public: &PublicKey,
    sender: &IdentityKeys,
) -> Result<DualBox, CryptoError> {
    let encoded = content_key.to_base64();
    encrypt_dual(&encoded, recipient_public, sender)
}

/// Open one wrapped copy of a content key.
pub fn unwrap_content_key(
    wrapped: &WireBox,
    sender_public: &PublicKey,
    my_secret: &StaticSecret,
) -> Result<ContentKey, CryptoError> {
    let encoded = Zeroizing::new(decrypt_wire(wrapped, sender_public, my_secret)?);
    let bytes = from_base64_array::<CONTENT_KEY_SIZE>(&encoded)
        .map_err(|_| CryptoError::DecryptionFailed)?;
    Ok(ContentKey::from_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::TAG_SIZE;

    #[test]
    fn test_file_roundtrip() {
        let body: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        let enc = encrypt_file_for_upload(&body).unwrap();

        assert_eq!(enc.cipher_blob.len(), body.len() + TAG_SIZE);

        let dec =
            decrypt_file_from_bytes(&enc.cipher_blob, &enc.iv, &enc.content_key, Some("image/png"))
                .unwrap();
        assert_eq!(dec.bytes, body);
        assert_eq!(dec.mime_type, "image/png");
    }

    #[test]
    fn test_empty_file_roundtrip() {
        let enc = encrypt_file_for_upload(&[]).unwrap();
        let dec = decrypt_file_from_bytes(&enc.cipher_blob, &enc.iv, &enc.content_key, None).unwrap();
        assert!(dec.bytes.is_empty());
        assert_eq!(dec.mime_type, DEFAULT_MIME_TYPE);
    }

    #[test]
    fn test_fresh_key_and_iv_per_file() {
        let a = encrypt_file_for_upload(b"same bytes").unwrap();
        let b = encrypt_file_for_upload(b"same bytes").unwrap();
        assert_ne!(a.iv, b.iv);
        assert_ne!(a.content_key.as_bytes(), b.content_key.as_bytes());
        assert_ne!(a.cipher_blob, b.cipher_blob);
    }

    #[test]
    fn test_tampered_blob_fails_authentication() {
        let enc = encrypt_file_for_upload(b"important attachment").unwrap();
        let mut blob = enc.cipher_blob.clone();
        blob[0] ^= 0x01;
        assert_eq!(
            decrypt_file_from_bytes(&blob, &enc.iv, &enc.content_key, None),
            Err(CryptoError::AuthenticationFailure)
        );
    }

    #[test]
    fn test_wrong_key_or_iv_fails_authentication() {
        let enc = encrypt_file_for_upload(b"payload").unwrap();

        let other_key = ContentKey::generate();
        assert_eq!(
            decrypt_file_from_bytes(&enc.cipher_blob, &enc.iv, &other_key, None),
            Err(CryptoError::AuthenticationFailure)
        );

        let mut iv = enc.iv;
        iv[11] ^= 0x80;
        assert_eq!(
            decrypt_file_from_bytes(&enc.cipher_blob, &iv, &enc.content_key, None),
            Err(CryptoError::AuthenticationFailure)
        );

        assert_eq!(
            decrypt_file_from_bytes(&enc.cipher_blob, &enc.iv[..8], &enc.content_key, None),
            Err(CryptoError::AuthenticationFailure)
        );
    }

    #[test]
    fn test_wrapped_key_roundtrip_both_sides() {
        let alice = IdentityKeys::generate();
        let bob = IdentityKeys::generate();
        let key = ContentKey::generate();

        let wrapped = wrap_content_key(&key, bob.public_key(), &alice).unwrap();

        let for_bob = unwrap_content_key(&wrapped.to_recipient, alice.public_key(), bob.secret()).unwrap();
        let for_alice =
            unwrap_content_key(&wrapped.to_sender, alice.public_key(), alice.secret()).unwrap();

        assert_eq!(for_bob.as_bytes(), key.as_bytes());
        assert_eq!(for_alice.as_bytes(), key.as_bytes());
    }

    #[test]
    fn test_unwrap_with_wrong_key_fails() {
        let alice = IdentityKeys::generate();
        let bob = IdentityKeys::generate();
        let eve = IdentityKeys::generate();
        let wrapped = wrap_content_key(&ContentKey::generate(), bob.public_key(), &alice).unwrap();

        assert!(unwrap_content_key(&wrapped.to_recipient, alice.public_key(), eve.secret()).is_err());
    }

    #[test]
    fn test_content_key_debug_redacted() {
        let key = ContentKey::generate();
        assert_eq!(format!("{key:?}"), "ContentKey(<redacted>)");
    }
}
