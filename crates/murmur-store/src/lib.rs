//! # murmur-store
//!
//! Local persistence for Murmur, backed by SQLite.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed helpers for the device identity
//! slot, the profile directory, append-only text and file message rows, and
//! the contact list. Encrypted attachment bodies live on disk in a
//! [`BlobDir`].

pub mod blobs;
pub mod contacts;
pub mod database;
pub mod files;
pub mod identity;
pub mod messages;
pub mod migrations;
pub mod profiles;

mod error;
mod rows;

pub use blobs::{storage_locator, BlobDir};
pub use contacts::Contact;
pub use database::Database;
pub use error::{Result, StoreError};
