//! Share operation errors.

use share_hub_core::StorageError;

/// Share operation error.
///
/// Messages never include the secret a caller presented.
#[derive(Debug, thiserror::Error)]
pub enum ShareError {
    #[error("Secret does not authorize this share")]
    Unauthorized,
    #[error("Key outside of session namespace: {key}")]
    InvalidKey { key: String },
    #[error("Session id must not be empty")]
    InvalidSessionId,
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Share actor is no longer running")]
    ActorUnavailable,
}
