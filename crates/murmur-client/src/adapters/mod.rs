//! Concrete collaborators: SQLite, blob directory, in-memory blobs and the
//! in-process room relay.

pub mod blob;
pub mod relay;
pub mod sqlite;

pub use blob::MemoryBlobStore;
pub use relay::{RelayConnection, RoomRelay};
pub use sqlite::{SharedDatabase, SqliteBackend, SqliteKeyStorage};
