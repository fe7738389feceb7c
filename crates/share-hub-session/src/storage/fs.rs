//! Filesystem archive store.
//!
//! Each object lives at `<root>/<key>`, so `share/session/info/abc.json`
//! becomes a regular file under the root directory.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use share_hub_core::{ArchiveObject, ArchiveStore, StorageError};
use tokio::fs;

/// Marker for files still being written.
const TEMP_PREFIX: &str = ".tmp-";

/// Archive store backed by a directory tree.
#[derive(Debug, Clone)]
pub struct FsArchiveStore {
    root: PathBuf,
}

impl FsArchiveStore {
    /// Create an archive rooted at `root`. The directory is created lazily.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the archive.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn relative(key: &str) -> Result<&Path, StorageError> {
        let path = Path::new(key);
        let valid = !key.is_empty()
            && path
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if valid {
            Ok(path)
        } else {
            Err(StorageError::InvalidKey(key.to_string()))
        }
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        Ok(self.root.join(Self::relative(key)?))
    }

    /// Directory that contains every object matching `prefix`.
    fn listing_dir(&self, prefix: &str) -> Result<PathBuf, StorageError> {
        match prefix.rsplit_once('/') {
            Some((dir, _)) if !dir.is_empty() => self.object_path(dir),
            _ => Ok(self.root.clone()),
        }
    }

    fn key_of(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Option<Vec<&str>> = relative
            .components()
            .map(|component| match component {
                Component::Normal(part) => part.to_str(),
                _ => None,
            })
            .collect();
        Some(parts?.join("/"))
    }

    async fn collect_keys(&self, dir: PathBuf, prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        let mut pending = vec![dir];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                    continue;
                }
                let is_temp = entry
                    .file_name()
                    .to_str()
                    .is_none_or(|name| name.starts_with(TEMP_PREFIX));
                if is_temp {
                    continue;
                }
                if let Some(key) = self.key_of(&path) {
                    if key.starts_with(prefix) {
                        keys.push(key);
                    }
                }
            }
        }

        Ok(keys)
    }
}

#[async_trait]
impl ArchiveStore for FsArchiveStore {
    async fn put(&self, key: &str, content: &Value) -> Result<(), StorageError> {
        let path = self.object_path(key)?;
        let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
            return Err(StorageError::InvalidKey(key.to_string()));
        };
        fs::create_dir_all(parent).await?;

        let mut temp_name = std::ffi::OsString::from(TEMP_PREFIX);
        temp_name.push(name);
        let temp = parent.join(temp_name);

        fs::write(&temp, serde_json::to_vec(content)?).await?;
        fs::rename(&temp, &path).await?;
        Ok(())
    }

    async fn list(&self, prefix: &str, limit: usize) -> Result<Vec<ArchiveObject>, StorageError> {
        let dir = self.listing_dir(prefix)?;
        let mut keys = self.collect_keys(dir, prefix).await?;
        keys.sort();
        keys.truncate(limit);
        Ok(keys.into_iter().map(|key| ArchiveObject { key }).collect())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.object_path(key)?).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
