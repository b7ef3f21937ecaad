use rusqlite::params;
use uuid::Uuid;

use murmur_shared::protocol::TextMessageRow;
use murmur_shared::types::UserId;
use murmur_shared::ConversationId;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::rows::{format_ts, parse_ts, parse_uuid};

const TEXT_COLUMNS: &str = "id, conversation_id, sender_id, recipient_id, sender_public_key,
    ciphertext_to_recipient, nonce_to_recipient, ciphertext_to_sender, nonce_to_sender, created_at";

impl Database {
    /// Append a text message row. Rows are never updated afterwards.
    pub fn insert_text_message(&self, row: &TextMessageRow) -> Result<()> {
        self.conn().execute(
            "INSERT INTO text_messages (id, conversation_id, sender_id, recipient_id,
                sender_public_key, ciphertext_to_recipient, nonce_to_recipient,
                ciphertext_to_sender, nonce_to_sender, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                row.id.to_string(),
                row.conversation_id.as_str(),
                row.sender_id.as_str(),
                row.recipient_id.as_str(),
                row.sender_public_key,
                row.ciphertext_to_recipient,
                row.nonce_to_recipient,
                row.ciphertext_to_sender,
                row.nonce_to_sender,
                format_ts(&row.created_at),
            ],
        )?;
        Ok(())
    }

    /// All text rows of a conversation, oldest first.
    pub fn get_text_messages_for_conversation(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<TextMessageRow>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {TEXT_COLUMNS}
             FROM text_messages
             WHERE conversation_id = ?1
             ORDER BY created_at ASC, rowid ASC"
        ))?;

        let rows = stmt.query_map(params![conversation_id.as_str()], row_to_text_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    pub fn get_text_message(&self, id: Uuid) -> Result<TextMessageRow> {
        self.conn()
            .query_row(
                &format!("SELECT {TEXT_COLUMNS} FROM text_messages WHERE id = ?1"),
                params![id.to_string()],
                row_to_text_message,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }
}

fn row_to_text_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<TextMessageRow> {
    let id_str: String = row.get(0)?;
    let created_str: String = row.get(9)?;

    Ok(TextMessageRow {
        id: parse_uuid(0, &id_str)?,
        conversation_id: ConversationId(row.get(1)?),
        sender_id: UserId(row.get(2)?),
        recipient_id: UserId(row.get(3)?),
        sender_public_key: row.get(4)?,
        ciphertext_to_recipient: row.get(5)?,
        nonce_to_recipient: row.get(6)?,
        ciphertext_to_sender: row.get(7)?,
        nonce_to_sender: row.get(8)?,
        created_at: parse_ts(9, &created_str)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use murmur_shared::conversation_key_for;

    use super::*;

    fn row(conversation: &ConversationId, offset_ms: i64) -> TextMessageRow {
        TextMessageRow {
            id: Uuid::new_v4(),
            conversation_id: conversation.clone(),
            sender_id: UserId::new("u1"),
            recipient_id: UserId::new("u2"),
            sender_public_key: "cGs=".into(),
            ciphertext_to_recipient: "Y3Q=".into(),
            nonce_to_recipient: "bm9uY2U=".into(),
            ciphertext_to_sender: "Y3Rz".into(),
            nonce_to_sender: "bm9uY2Vz".into(),
            created_at: Utc::now() + Duration::milliseconds(offset_ms),
        }
    }

    #[test]
    fn insert_and_list_in_creation_order() {
        let db = Database::open_in_memory().unwrap();
        let conv = conversation_key_for("u1", "u2");
        let other = conversation_key_for("u1", "u3");

        let later = row(&conv, 50);
        let earlier = row(&conv, 0);
        db.insert_text_message(&later).unwrap();
        db.insert_text_message(&earlier).unwrap();
        db.insert_text_message(&row(&other, 10)).unwrap();

        let listed = db.get_text_messages_for_conversation(&conv).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, earlier.id);
        assert_eq!(listed[1].id, later.id);
        assert_eq!(listed[1].ciphertext_to_sender, later.ciphertext_to_sender);
    }

    #[test]
    fn get_by_id() {
        let db = Database::open_in_memory().unwrap();
        let r = row(&conversation_key_for("u1", "u2"), 0);
        db.insert_text_message(&r).unwrap();

        let fetched = db.get_text_message(r.id).unwrap();
        assert_eq!(fetched.nonce_to_recipient, r.nonce_to_recipient);
        assert!(matches!(
            db.get_text_message(Uuid::new_v4()),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn duplicate_id_rejected() {
        let db = Database::open_in_memory().unwrap();
        let r = row(&conversation_key_for("u1", "u2"), 0);
        db.insert_text_message(&r).unwrap();
        assert!(db.insert_text_message(&r).is_err());
    }
}
