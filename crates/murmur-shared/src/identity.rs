use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use x25519_dalek::{PublicKey, StaticSecret};

use crate::constants::{PUBLIC_KEY_SIZE, SECRET_KEY_SIZE};
use crate::encoding::{from_base64_array, to_base64};
use crate::error::{CryptoError, KeyStoreError};

/// A device's X25519 identity keypair.
/// The secret half never leaves the device; `Debug` output redacts it.
#[derive(Clone)]
pub struct IdentityKeys {
    secret: StaticSecret,
    public: PublicKey,
}

/// Serialized form kept in device-local storage.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoredIdentity {
    pub public_key: String,
    pub secret_key: String,
}

impl IdentityKeys {
    /// Generate a new random keypair from the OS CSPRNG
    pub fn generate() -> Self {
        Self::from_secret(StaticSecret::random_from_rng(OsRng))
    }

    /// Restore a keypair from secret key bytes
    pub fn from_secret_bytes(secret: [u8; SECRET_KEY_SIZE]) -> Self {
        Self::from_secret(StaticSecret::from(secret))
    }

    fn from_secret(secret: StaticSecret) -> Self {
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Restore from the stored form, checking that both halves belong together
    pub fn from_stored(stored: &StoredIdentity) -> Result<Self, KeyStoreError> {
        let secret: [u8; SECRET_KEY_SIZE] = from_base64_array(&stored.secret_key)
            .map_err(|e| KeyStoreError::Corrupt(format!("secret key: {e}")))?;
        let public: [u8; PUBLIC_KEY_SIZE] = from_base64_array(&stored.public_key)
            .map_err(|e| KeyStoreError::Corrupt(format!("public key: {e}")))?;

        let keys = Self::from_secret_bytes(secret);
        if keys.public.as_bytes() != &public {
            return Err(KeyStoreError::Corrupt(
                "public key does not match secret key".into(),
            ));
        }
        Ok(keys)
    }

    pub fn to_stored(&self) -> StoredIdentity {
        StoredIdentity {
            public_key: self.public_key_b64(),
            secret_key: to_base64(self.secret.as_bytes()),
        }
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    pub fn public_key_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.public.to_bytes()
    }

    /// Public key in the base64 form published to the profile directory
    pub fn public_key_b64(&self) -> String {
        to_base64(self.public.as_bytes())
    }

    pub fn secret(&self) -> &StaticSecret {
        &self.secret
    }
}

impl std::fmt::Debug for IdentityKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityKeys")
            .field("public", &self.public_key_b64())
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl std::fmt::Debug for StoredIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredIdentity")
            .field("public_key", &self.public_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Parse a peer's base64 public key as published in the profile directory
pub fn parse_public_key(encoded: &str) -> Result<PublicKey, CryptoError> {
    let bytes: [u8; PUBLIC_KEY_SIZE] = from_base64_array(encoded)?;
    Ok(PublicKey::from(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_generation() {
        let keys = IdentityKeys::generate();
        assert_eq!(keys.public_key_bytes().len(), 32);
        assert_ne!(keys.public_key_bytes(), [0u8; 32]);
    }

    #[test]
    fn test_stored_roundtrip() {
        let keys = IdentityKeys::generate();
        let restored = IdentityKeys::from_stored(&keys.to_stored()).unwrap();
        assert_eq!(keys.public_key_bytes(), restored.public_key_bytes());
        assert_eq!(keys.secret().to_bytes(), restored.secret().to_bytes());
    }

    #[test]
    fn test_stored_json_field_names() {
        let json = serde_json::to_value(IdentityKeys::generate().to_stored()).unwrap();
        assert!(json.get("publicKey").is_some());
        assert!(json.get("secretKey").is_some());
    }

    #[test]
    fn test_mismatched_halves_rejected() {
        let a = IdentityKeys::generate().to_stored();
        let b = IdentityKeys::generate().to_stored();
        let mixed = StoredIdentity {
            public_key: a.public_key,
            secret_key: b.secret_key,
        };
        assert!(matches!(
            IdentityKeys::from_stored(&mixed),
            Err(KeyStoreError::Corrupt(_))
        ));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let keys = IdentityKeys::generate();
        let secret_b64 = keys.to_stored().secret_key;
        let printed = format!("{keys:?}");
        assert!(printed.contains("<redacted>"));
        assert!(!printed.contains(&secret_b64));

        let stored = format!("{:?}", keys.to_stored());
        assert!(stored.contains(&keys.public_key_b64()));
        assert!(!stored.contains(&secret_b64));
    }

    #[test]
    fn test_parse_public_key() {
        let keys = IdentityKeys::generate();
        let parsed = parse_public_key(&keys.public_key_b64()).unwrap();
        assert_eq!(parsed.as_bytes(), keys.public_key().as_bytes());
        assert!(parse_public_key("AAAA").is_err());
    }
}
