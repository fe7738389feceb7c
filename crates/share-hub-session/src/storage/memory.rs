//! In-memory storage.

use std::{
    collections::{BTreeMap, HashMap},
    sync::RwLock,
};

use async_trait::async_trait;
use serde_json::Value;
use share_hub_core::{ArchiveObject, ArchiveStore, KeyValueStore, StorageError};

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Backend(e.to_string())
}

/// In-memory durable store.
///
/// Useful for development and single-process deployments.
/// Data is lost on restart.
#[derive(Default)]
pub struct MemoryKeyValueStore {
    namespaces: RwLock<HashMap<String, BTreeMap<String, Value>>>,
}

impl MemoryKeyValueStore {
    /// Create a new in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn list(&self, namespace: &str) -> Result<BTreeMap<String, Value>, StorageError> {
        Ok(self
            .namespaces
            .read()
            .map_err(poisoned)?
            .get(namespace)
            .cloned()
            .unwrap_or_default())
    }

    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self
            .namespaces
            .read()
            .map_err(poisoned)?
            .get(namespace)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    async fn put(&self, namespace: &str, key: &str, value: Value) -> Result<(), StorageError> {
        self.namespaces
            .write()
            .map_err(poisoned)?
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn delete_all(&self, namespace: &str) -> Result<(), StorageError> {
        self.namespaces.write().map_err(poisoned)?.remove(namespace);
        Ok(())
    }
}

/// In-memory archive store.
///
/// Keeps objects as serialized JSON, the way an object store would.
#[derive(Default)]
pub struct MemoryArchiveStore {
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryArchiveStore {
    /// Create a new in-memory archive.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoded content of an object, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        let objects = self.objects.read().ok()?;
        serde_json::from_slice(objects.get(key)?).ok()
    }

    /// Number of stored objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.read().map_or(0, |objects| objects.len())
    }

    /// Whether the archive holds no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ArchiveStore for MemoryArchiveStore {
    async fn put(&self, key: &str, content: &Value) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec(content)?;
        self.objects
            .write()
            .map_err(poisoned)?
            .insert(key.to_string(), bytes);
        Ok(())
    }

    async fn list(&self, prefix: &str, limit: usize) -> Result<Vec<ArchiveObject>, StorageError> {
        let objects = self.objects.read().map_err(poisoned)?;
        Ok(objects
            .range::<str, _>((std::ops::Bound::Included(prefix), std::ops::Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix))
            .take(limit)
            .map(|(key, _)| ArchiveObject { key: key.clone() })
            .collect())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.objects.write().map_err(poisoned)?.remove(key);
        Ok(())
    }
}
