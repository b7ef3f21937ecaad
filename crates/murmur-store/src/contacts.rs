use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};

use murmur_shared::types::UserId;

use crate::database::Database;
use crate::error::Result;
use crate::rows::{format_ts, parse_ts};

/// A peer the owner has chatted with, joined with the peer's profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contact {
    pub peer_id: UserId,
    /// `"unknown"` when the peer has no directory entry.
    pub username: String,
    /// Empty when the peer has no directory entry.
    pub public_key: String,
    pub last_message_at: DateTime<Utc>,
}

impl Database {
    pub fn upsert_contact(
        &self,
        owner_id: &UserId,
        peer_id: &UserId,
        last_message_at: DateTime<Utc>,
    ) -> Result<()> {
        self.conn().execute(
            "INSERT INTO contacts (owner_id, peer_id, last_message_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(owner_id, peer_id) DO UPDATE SET last_message_at = excluded.last_message_at",
            params![owner_id.as_str(), peer_id.as_str(), format_ts(&last_message_at)],
        )?;
        Ok(())
    }

    /// Contacts of `owner_id`, most recent conversation first.
    pub fn list_contacts(&self, owner_id: &UserId) -> Result<Vec<Contact>> {
        let mut stmt = self.conn().prepare(
            "SELECT c.peer_id, p.username, p.public_key, c.last_message_at
             FROM contacts c
             LEFT JOIN profiles p ON p.id = c.peer_id
             WHERE c.owner_id = ?1
             ORDER BY c.last_message_at DESC",
        )?;

        let rows = stmt.query_map(params![owner_id.as_str()], |row| {
            let username: Option<String> = row.get(1)?;
            let public_key: Option<String> = row.get(2)?;
            let last_str: String = row.get(3)?;
            Ok(Contact {
                peer_id: UserId(row.get(0)?),
                username: username.unwrap_or_else(|| "unknown".to_string()),
                public_key: public_key.unwrap_or_default(),
                last_message_at: parse_ts(3, &last_str)?,
            })
        })?;

        let mut contacts = Vec::new();
        for row in rows {
            contacts.push(row?);
        }
        Ok(contacts)
    }
}
