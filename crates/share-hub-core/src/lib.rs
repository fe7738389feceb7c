//! Core abstractions for the session share hub.
//!
//! This crate provides the fundamental building blocks:
//! - `StateKey` - Namespaced keys for session info and messages
//! - `ShareFrame` - The `{key, content}` unit pushed to viewers
//! - `SessionData` - The `{info, messages}` view of a shared session
//! - Storage traits for the durable key-value store and the archive store

pub mod frame;
pub mod keys;
pub mod traits;

pub use frame::{SessionData, ShareFrame, ShareRecord};
pub use keys::{StateKey, short_id};
pub use traits::{ArchiveObject, ArchiveStore, KeyValueStore, StorageError};
