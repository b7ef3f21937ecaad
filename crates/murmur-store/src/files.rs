use rusqlite::params;
use uuid::Uuid;

use murmur_shared::protocol::FileMessageRow;
use murmur_shared::types::UserId;
use murmur_shared::ConversationId;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::rows::{format_ts, parse_ts, parse_uuid};

const FILE_COLUMNS: &str = "id, conversation_id, sender_id, recipient_id, sender_public_key,
    storage_locator, file_name, mime_type, size_bytes, iv,
    wrapped_key_to_recipient, wrap_nonce_to_recipient, wrapped_key_to_sender,
    wrap_nonce_to_sender, created_at";

impl Database {
    /// Append a file message row. The blob it references must already be stored.
    pub fn insert_file_message(&self, row: &FileMessageRow) -> Result<()> {
        self.conn().execute(
            &format!(
                "INSERT INTO file_messages ({FILE_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
            ),
            params![
                row.id.to_string(),
                row.conversation_id.as_str(),
                row.sender_id.as_str(),
                row.recipient_id.as_str(),
                row.sender_public_key,
                row.storage_locator,
                row.file_name,
                row.mime_type,
                row.size_bytes as i64,
                row.iv,
                row.wrapped_key_to_recipient,
                row.wrap_nonce_to_recipient,
                row.wrapped_key_to_sender,
                row.wrap_nonce_to_sender,
                format_ts(&row.created_at),
            ],
        )?;
        Ok(())
    }

    /// All file rows of a conversation, oldest first.
    pub fn get_file_messages_for_conversation(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<FileMessageRow>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {FILE_COLUMNS}
             FROM file_messages
             WHERE conversation_id = ?1
             ORDER BY created_at ASC, rowid ASC"
        ))?;

        let rows = stmt.query_map(params![conversation_id.as_str()], row_to_file_message)?;

        let mut files = Vec::new();
        for row in rows {
            files.push(row?);
        }
        Ok(files)
    }

    pub fn get_file_message(&self, id: Uuid) -> Result<FileMessageRow> {
        self.conn()
            .query_row(
                &format!("SELECT {FILE_COLUMNS} FROM file_messages WHERE id = ?1"),
                params![id.to_string()],
                row_to_file_message,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }
}

fn row_to_file_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<FileMessageRow> {
    let id_str: String = row.get(0)?;
    let size: i64 = row.get(8)?;
    let created_str: String = row.get(14)?;

    Ok(FileMessageRow {
        id: parse_uuid(0, &id_str)?,
        conversation_id: ConversationId(row.get(1)?),
        sender_id: UserId(row.get(2)?),
        recipient_id: UserId(row.get(3)?),
        sender_public_key: row.get(4)?,
        storage_locator: row.get(5)?,
        file_name: row.get(6)?,
        mime_type: row.get(7)?,
        size_bytes: size.max(0) as u64,
        iv: row.get(9)?,
        wrapped_key_to_recipient: row.get(10)?,
        wrap_nonce_to_recipient: row.get(11)?,
        wrapped_key_to_sender: row.get(12)?,
        wrap_nonce_to_sender: row.get(13)?,
        created_at: parse_ts(14, &created_str)?,
    })
}
