use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::constants::CONVERSATION_SEPARATOR;

/// Order-independent identifier of a 1:1 conversation: the lowercase hex
/// SHA-256 of the two sorted participant ids. Used as relay room name and
/// storage partition key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn conversation_key_for(id_a: &str, id_b: &str) -> ConversationId {
    let (first, second) = if id_a <= id_b { (id_a, id_b) } else { (id_b, id_a) };

    let mut hasher = Sha256::new();
    hasher.update(first.as_bytes());
    hasher.update(CONVERSATION_SEPARATOR.as_bytes());
    hasher.update(second.as_bytes());

    ConversationId(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_independent() {
        assert_eq!(conversation_key_for("u1", "u2"), conversation_key_for("u2", "u1"));
    }

    #[test]
    fn test_distinct_pairs_distinct_ids() {
        assert_ne!(conversation_key_for("u1", "u2"), conversation_key_for("u1", "u3"));
    }

    #[test]
    fn test_known_digest() {
        // sha256("u1:u2")
        let expected = hex::encode(Sha256::digest(b"u1:u2"));
        assert_eq!(conversation_key_for("u2", "u1").as_str(), expected);
    }

    #[test]
    fn test_lowercase_hex_256_bit() {
        let id = conversation_key_for("alice", "bob");
        assert_eq!(id.as_str().len(), 64);
        assert!(id
            .as_str()
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_separator_prevents_concatenation_collisions() {
        assert_ne!(conversation_key_for("a", "bc"), conversation_key_for("ab", "c"));
    }
}
