use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use murmur_shared::types::{Profile, UserId};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::rows::format_ts;

impl Database {
    /// Publish a profile, or update the username and public key of an
    /// existing one. Usernames are unique across the directory.
    pub fn upsert_profile(&self, profile: &Profile) -> Result<()> {
        if let Some(holder) = self.get_profile_by_username(&profile.username)? {
            if holder.id != profile.id {
                return Err(StoreError::UsernameTaken(profile.username.clone()));
            }
        }

        self.conn().execute(
            "INSERT INTO profiles (id, username, public_key, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                username = excluded.username,
                public_key = excluded.public_key",
            params![
                profile.id.as_str(),
                profile.username,
                profile.public_key,
                format_ts(&Utc::now()),
            ],
        )?;
        Ok(())
    }

    pub fn get_profile_by_id(&self, id: &UserId) -> Result<Option<Profile>> {
        let profile = self
            .conn()
            .query_row(
                "SELECT id, username, public_key FROM profiles WHERE id = ?1",
                params![id.as_str()],
                row_to_profile,
            )
            .optional()?;
        Ok(profile)
    }

    pub fn get_profile_by_username(&self, username: &str) -> Result<Option<Profile>> {
        let profile = self
            .conn()
            .query_row(
                "SELECT id, username, public_key FROM profiles WHERE username = ?1",
                params![username],
                row_to_profile,
            )
            .optional()?;
        Ok(profile)
    }
}

fn row_to_profile(row: &rusqlite::Row<'_>) -> rusqlite::Result<Profile> {
    Ok(Profile {
        id: UserId(row.get(0)?),
        username: row.get(1)?,
        public_key: row.get(2)?,
    })
}
