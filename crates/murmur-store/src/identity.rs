//! Device-local key slots.
//!
//! Backs the identity key store on a device: values are opaque strings,
//! keyed by slot name, and never leave the local database.

use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::error::Result;

impl Database {
    pub fn load_key_slot(&self, slot: &str) -> Result<Option<String>> {
        let value = self
            .conn()
            .query_row(
                "SELECT value FROM local_identity WHERE slot = ?1",
                params![slot],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn save_key_slot(&self, slot: &str, value: &str) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO local_identity (slot, value) VALUES (?1, ?2)",
            params![slot, value],
        )?;
        Ok(())
    }

    pub fn delete_key_slot(&self, slot: &str) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM local_identity WHERE slot = ?1", params![slot])?;
        Ok(affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_lifecycle() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.load_key_slot("k").unwrap(), None);

        db.save_key_slot("k", "v1").unwrap();
        db.save_key_slot("k", "v2").unwrap();
        assert_eq!(db.load_key_slot("k").unwrap().as_deref(), Some("v2"));

        assert!(db.delete_key_slot("k").unwrap());
        assert!(!db.delete_key_slot("k").unwrap());
        assert_eq!(db.load_key_slot("k").unwrap(), None);
    }
}
