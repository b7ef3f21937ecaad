//! Authenticated public-key encryption of short text payloads.
//!
//! A box key is agreed with X25519 between one party's secret key and the
//! other's public key, passed through BLAKE3 `derive_key`, and used with
//! XChaCha20-Poly1305 under a fresh random 24-byte nonce. Opening requires the
//! matching (secret, public) pair from the other side, so every ciphertext is
//! bound to both sender and recipient.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::constants::{BOX_NONCE_SIZE, KDF_CONTEXT_BOX_KEY};
use crate::encoding::{from_base64, to_base64};
use crate::error::CryptoError;
use crate::identity::IdentityKeys;

/// One ciphertext + nonce pair, in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedBox {
    pub ciphertext: Vec<u8>,
    pub nonce: [u8; BOX_NONCE_SIZE],
}

/// The base64 form of a [`SealedBox`] as it is persisted and relayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireBox {
    pub ciphertext: String,
    pub nonce: String,
}

impl SealedBox {
    pub fn to_wire(&self) -> WireBox {
        WireBox {
            ciphertext: to_base64(&self.ciphertext),
            nonce: to_base64(&self.nonce),
        }
    }
}

/// Both copies of one dual-encrypted payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DualBox {
    /// Opens with the recipient's secret key and the sender's public key.
    pub to_recipient: WireBox,
    /// Opens with the sender's own secret key and public key.
    pub to_sender: WireBox,
}

pub fn generate_nonce() -> [u8; BOX_NONCE_SIZE] {
    let mut nonce = [0u8; BOX_NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce);
    nonce
}

fn box_cipher(their_public: &PublicKey, my_secret: &StaticSecret) -> Result<XChaCha20Poly1305, CryptoError> {
    let shared = my_secret.diffie_hellman(their_public);
    if !shared.was_contributory() {
        return Err(CryptoError::WeakPublicKey);
    }

    let key = Zeroizing::new(blake3::derive_key(KDF_CONTEXT_BOX_KEY, shared.as_bytes()));
    Ok(XChaCha20Poly1305::new((&*key).into()))
}

pub fn encrypt_for_recipient(
    plaintext: &str,
    recipient_public: &PublicKey,
    sender_secret: &StaticSecret,
) -> Result<SealedBox, CryptoError> {
    let cipher = box_cipher(recipient_public, sender_secret)?;
    let nonce = generate_nonce();

    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), plaintext.as_bytes())
        .map_err(|_| CryptoError::EncryptionFailed)?;

    Ok(SealedBox { ciphertext, nonce })
}

/// Open a box. Every failure (wrong keys, tampering, bad nonce length, invalid
/// UTF-8) collapses into [`CryptoError::DecryptionFailed`].
pub fn decrypt_from_sender(
    ciphertext: &[u8],
    nonce: &[u8],
    sender_public: &PublicKey,
    my_secret: &StaticSecret,
) -> Result<String, CryptoError> {
    if nonce.len() != BOX_NONCE_SIZE {
        return Err(CryptoError::DecryptionFailed);
    }

    let cipher =
        box_cipher(sender_public, my_secret).map_err(|_| CryptoError::DecryptionFailed)?;
    let plain = cipher
        .decrypt(XNonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)?;

    String::from_utf8(plain).map_err(|_| CryptoError::DecryptionFailed)
}

/// [`decrypt_from_sender`] over the base64 wire form.
pub fn decrypt_wire(
    sealed: &WireBox,
    sender_public: &PublicKey,
    my_secret: &StaticSecret,
) -> Result<String, CryptoError> {
    let ciphertext = from_base64(&sealed.ciphertext).map_err(|_| CryptoError::DecryptionFailed)?;
    let nonce = from_base64(&sealed.nonce).map_err(|_| CryptoError::DecryptionFailed)?;
    decrypt_from_sender(&ciphertext, &nonce, sender_public, my_secret)
}

/// Encrypt one plaintext twice: once for the recipient and once for the
/// sender's own public key, both under the sender's secret key.
pub fn encrypt_dual(
    plaintext: &str,
    recipient_public: &PublicKey,
    sender: &IdentityKeys,
) -> Result<DualBox, CryptoError> {
    let to_recipient = encrypt_for_recipient(plaintext, recipient_public, sender.secret())?;
    let to_sender = encrypt_for_recipient(plaintext, sender.public_key(), sender.secret())?;

    Ok(DualBox {
        to_recipient: to_recipient.to_wire(),
        to_sender: to_sender.to_wire(),
    })
}
