//! Base64 transport encoding for every byte string that crosses a storage or
//! relay boundary. Raw bytes only ever live in memory.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::CryptoError;

pub fn to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn from_base64(encoded: &str) -> Result<Vec<u8>, CryptoError> {
    STANDARD
        .decode(encoded.trim())
        .map_err(|_| CryptoError::InvalidEncoding)
}

/// Decode into a fixed-size array, rejecting any other length.
pub fn from_base64_array<const N: usize>(encoded: &str) -> Result<[u8; N], CryptoError> {
    let bytes = from_base64(encoded)?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::InvalidKeyLength)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_padded_alphabet() {
        assert_eq!(to_base64(b"hi"), "aGk=");
        assert_eq!(from_base64("aGk=").unwrap(), b"hi");
    }

    #[test]
    fn test_invalid_input_rejected() {
        assert_eq!(from_base64("not base64!"), Err(CryptoError::InvalidEncoding));
    }

    #[test]
    fn test_fixed_length_enforced() {
        let encoded = to_base64(&[7u8; 31]);
        assert_eq!(
            from_base64_array::<32>(&encoded),
            Err(CryptoError::InvalidKeyLength)
        );
        assert_eq!(from_base64_array::<31>(&encoded).unwrap(), [7u8; 31]);
    }
}
