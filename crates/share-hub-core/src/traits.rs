//! Core traits for durable and archival storage.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Storage error.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
    #[error("Storage error: {0}")]
    Backend(String),
}

/// Durable key-value store holding the live state of each session actor.
///
/// Every call is scoped to a namespace, the address of the owning actor.
/// Only that actor writes to its namespace, and a write must be visible to
/// any read issued after it completes.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// All entries of a namespace, ordered by key.
    async fn list(&self, namespace: &str) -> Result<BTreeMap<String, Value>, StorageError>;

    /// A single entry.
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Value>, StorageError>;

    /// Insert or overwrite an entry.
    async fn put(&self, namespace: &str, key: &str, value: Value) -> Result<(), StorageError>;

    /// Remove every entry of a namespace.
    async fn delete_all(&self, namespace: &str) -> Result<(), StorageError>;
}

/// An object returned by an archive listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveObject {
    /// Full object key, usable with [`ArchiveStore::delete`].
    pub key: String,
}

/// Object store keeping a copy of published state beyond the hub's lifetime.
#[async_trait]
pub trait ArchiveStore: Send + Sync {
    /// Store `content` as JSON under `key`, replacing any previous object.
    async fn put(&self, key: &str, content: &Value) -> Result<(), StorageError>;

    /// Up to `limit` objects whose key starts with `prefix`, ordered by key.
    async fn list(&self, prefix: &str, limit: usize) -> Result<Vec<ArchiveObject>, StorageError>;

    /// Remove an object. Removing a missing object succeeds.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}
