//! In-memory storage handler.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tonbag_core::effects::storage::validate_key;
use tonbag_core::effects::{StorageEffects, StorageError};

/// Memory storage handler for testing
///
/// Clones share the same map, so a test can keep a handle and inspect what
/// the code under test wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorageHandler {
    data: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryStorageHandler {
    /// Create an empty handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.data.lock().len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.data.lock().is_empty()
    }

    /// Stored bytes under `key`, bypassing the effect interface.
    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.data.lock().get(key).cloned()
    }

    /// Make `store` and `remove` fail until switched back off. Reads keep
    /// working.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Store bytes under `key`, bypassing the effect interface.
    pub fn insert_raw(&self, key: &str, value: impl Into<Vec<u8>>) {
        self.data.lock().insert(key.to_string(), value.into());
    }
}

#[async_trait]
impl StorageEffects for MemoryStorageHandler {
    async fn store(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        validate_key(key)?;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::WriteFailed(format!("{key}: disk full")));
        }
        self.data.lock().insert(key.to_string(), value);
        Ok(())
    }

    async fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        validate_key(key)?;
        Ok(self.data.lock().get(key).cloned())
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        validate_key(key)?;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::DeleteFailed(format!("{key}: read-only")));
        }
        Ok(self.data.lock().remove(key).is_some())
    }

    async fn list_keys(&self, prefix: Option<&str>) -> Result<Vec<String>, StorageError> {
        let data = self.data.lock();
        Ok(data
            .keys()
            .filter(|key| prefix.map_or(true, |prefix| key.starts_with(prefix)))
            .cloned()
            .collect())
    }
}
