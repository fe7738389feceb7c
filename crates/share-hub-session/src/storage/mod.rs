//! Storage implementations.

#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "fs")]
pub mod fs;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "memory")]
pub use memory::{MemoryArchiveStore, MemoryKeyValueStore};

#[cfg(feature = "fs")]
pub use fs::FsArchiveStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteKeyValueStore;
