//! v001 -- Initial schema creation.
//!
//! Creates `local_identity`, `profiles`, `text_messages`, `file_messages`
//! and `contacts`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Device-local key slots (never synchronised)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS local_identity (
    slot  TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL                      -- JSON {publicKey, secretKey}
);

-- ----------------------------------------------------------------
-- Profile directory
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS profiles (
    id         TEXT PRIMARY KEY NOT NULL,
    username   TEXT NOT NULL UNIQUE,
    public_key TEXT NOT NULL,                -- base64 X25519 public key
    created_at TEXT NOT NULL                 -- RFC-3339
);

-- ----------------------------------------------------------------
-- Text messages (append-only)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS text_messages (
    id                      TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    conversation_id         TEXT NOT NULL,              -- sha256 hex
    sender_id               TEXT NOT NULL,
    recipient_id            TEXT NOT NULL,
    sender_public_key       TEXT NOT NULL,
    ciphertext_to_recipient TEXT NOT NULL,
    nonce_to_recipient      TEXT NOT NULL,
    ciphertext_to_sender    TEXT NOT NULL,
    nonce_to_sender         TEXT NOT NULL,
    created_at              TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_text_messages_conversation
    ON text_messages(conversation_id, created_at);

-- ----------------------------------------------------------------
-- File messages (metadata only; bodies live in the blob store)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS file_messages (
    id                       TEXT PRIMARY KEY NOT NULL,
    conversation_id          TEXT NOT NULL,
    sender_id                TEXT NOT NULL,
    recipient_id             TEXT NOT NULL,
    sender_public_key        TEXT NOT NULL,
    storage_locator          TEXT NOT NULL UNIQUE,
    file_name                TEXT NOT NULL,
    mime_type                TEXT NOT NULL,
    size_bytes               INTEGER NOT NULL,
    iv                       TEXT NOT NULL,
    wrapped_key_to_recipient TEXT NOT NULL,
    wrap_nonce_to_recipient  TEXT NOT NULL,
    wrapped_key_to_sender    TEXT NOT NULL,
    wrap_nonce_to_sender     TEXT NOT NULL,
    created_at               TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_file_messages_conversation
    ON file_messages(conversation_id, created_at);

-- ----------------------------------------------------------------
-- Contacts
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS contacts (
    owner_id        TEXT NOT NULL,
    peer_id         TEXT NOT NULL,
    last_message_at TEXT NOT NULL,

    PRIMARY KEY (owner_id, peer_id)
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
