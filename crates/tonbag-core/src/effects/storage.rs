//! Key-value storage interface.
//!
//! Keys are `/`-separated paths (`provider-drafts/<bag>`); values are opaque
//! bytes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Error type for storage operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum StorageError {
    /// The key is not usable as a storage path
    #[error("invalid key: {reason}")]
    InvalidKey {
        /// Why the key was rejected
        reason: String,
    },
    /// Reading failed
    #[error("read failed: {0}")]
    ReadFailed(String),
    /// Writing failed
    #[error("write failed: {0}")]
    WriteFailed(String),
    /// Deleting failed
    #[error("delete failed: {0}")]
    DeleteFailed(String),
}

/// Basic persistence operations.
#[async_trait]
pub trait StorageEffects: Send + Sync {
    /// Store `value` under `key`, replacing any previous value.
    async fn store(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

    /// Read the value under `key`.
    async fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Delete `key`; returns whether it existed.
    async fn remove(&self, key: &str) -> Result<bool, StorageError>;

    /// List keys, optionally restricted to those starting with `prefix`.
    async fn list_keys(&self, prefix: Option<&str>) -> Result<Vec<String>, StorageError>;
}

/// Reject keys that would escape the storage namespace.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey {
            reason: "Key cannot be empty".to_string(),
        });
    }
    if key.starts_with('/') || key.split('/').any(|part| part.is_empty() || part == "..") {
        return Err(StorageError::InvalidKey {
            reason: format!("Key is not a relative path: {key}"),
        });
    }
    Ok(())
}
