//! Layer 3: Storage Effect Handlers - Production Only
//!
//! Filesystem implementation of [`StorageEffects`]. Each key becomes one
//! `<key>.dat` file below the base directory; `/` in keys maps to
//! subdirectories.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::fs::DirEntry;
use tonbag_core::effects::storage::validate_key;
use tonbag_core::effects::{StorageEffects, StorageError};

const FILE_EXTENSION: &str = "dat";

/// Filesystem-based storage handler for production use
///
/// Stateless; every call goes straight to the filesystem.
#[derive(Debug, Clone)]
pub struct FilesystemStorageHandler {
    /// Base directory for storage files
    base_path: PathBuf,
}

impl FilesystemStorageHandler {
    /// Create a new filesystem storage handler
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Base directory the handler writes below.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn file_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.base_path.join(format!("{key}.{FILE_EXTENSION}")))
    }

    async fn visit_entry_for_keys(
        base: &Path,
        entry: DirEntry,
        prefix: Option<&str>,
        stack: &mut Vec<PathBuf>,
        keys: &mut Vec<String>,
    ) -> Result<(), StorageError> {
        let file_type = entry.file_type().await.map_err(|e| {
            StorageError::ReadFailed(format!("Failed to stat directory entry: {e}"))
        })?;
        let path = entry.path();

        if file_type.is_dir() {
            stack.push(path);
            return Ok(());
        }
        if !file_type.is_file() {
            return Ok(());
        }
        if path.extension().and_then(|e| e.to_str()) != Some(FILE_EXTENSION) {
            return Ok(());
        }

        let rel = path.strip_prefix(base).map_err(|e| {
            StorageError::ReadFailed(format!("Failed to compute relative key path: {e}"))
        })?;
        let mut key = rel.with_extension("").to_string_lossy().to_string();
        if std::path::MAIN_SEPARATOR != '/' {
            key = key.replace(std::path::MAIN_SEPARATOR, "/");
        }

        if prefix.map_or(true, |p| key.starts_with(p)) {
            keys.push(key);
        }
        Ok(())
    }
}

#[async_trait]
impl StorageEffects for FilesystemStorageHandler {
    async fn store(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        let file_path = self.file_path(key)?;
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::WriteFailed(format!("Failed to create directory: {e}"))
            })?;
        }

        // Write next to the target and rename so a crash never leaves half a file.
        let tmp_path = file_path.with_extension(format!("{FILE_EXTENSION}.tmp"));
        fs::write(&tmp_path, value)
            .await
            .map_err(|e| StorageError::WriteFailed(format!("Failed to write file: {e}")))?;
        fs::rename(&tmp_path, &file_path)
            .await
            .map_err(|e| StorageError::WriteFailed(format!("Failed to replace file: {e}")))?;

        Ok(())
    }

    async fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let file_path = self.file_path(key)?;
        match fs::read(&file_path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::ReadFailed(format!(
                "Failed to read file: {e}"
            ))),
        }
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let file_path = self.file_path(key)?;
        match fs::remove_file(&file_path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to remove file: {e}"
            ))),
        }
    }

    async fn list_keys(&self, prefix: Option<&str>) -> Result<Vec<String>, StorageError> {
        // Keys may contain `/`, so the tree is walked recursively.
        let mut keys = Vec::new();
        let mut stack: Vec<PathBuf> = vec![self.base_path.clone()];

        while let Some(dir) = stack.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(e) => e,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(StorageError::ReadFailed(format!(
                        "Failed to read directory: {e}"
                    )))
                }
            };

            while let Some(entry) = entries.next_entry().await.map_err(|e| {
                StorageError::ReadFailed(format!("Failed to read directory entry: {e}"))
            })? {
                Self::visit_entry_for_keys(&self.base_path, entry, prefix, &mut stack, &mut keys)
                    .await?;
            }
        }

        keys.sort();
        Ok(keys)
    }
}
