use serde::{Deserialize, Serialize};

// Stable account identity as issued by the profile directory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Directory entry: the only place a peer's public key is learned from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub id: UserId,
    pub username: String,
    /// Base64 X25519 public key of the user's device.
    pub public_key: String,
}

/// Which ciphertext slot of a row a reader can open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReaderRole {
    Sender,
    Recipient,
}

impl ReaderRole {
    pub fn of(reader: &UserId, sender: &UserId, recipient: &UserId) -> Option<Self> {
        if reader == recipient {
            Some(Self::Recipient)
        } else if reader == sender {
            Some(Self::Sender)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_role() {
        let a = UserId::new("a");
        let b = UserId::new("b");
        let c = UserId::new("c");
        assert_eq!(ReaderRole::of(&a, &a, &b), Some(ReaderRole::Sender));
        assert_eq!(ReaderRole::of(&b, &a, &b), Some(ReaderRole::Recipient));
        assert_eq!(ReaderRole::of(&c, &a, &b), None);
    }
}
