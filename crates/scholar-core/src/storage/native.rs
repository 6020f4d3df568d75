// Native filesystem storage
//
// Every write goes to a sibling temp file first and is renamed into place,
// so a crash mid-write leaves the previous artifact intact.

use super::{StorageBackend, StorageError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

const TEMP_SUFFIX: &str = ".tmp";

/// Filesystem storage backend rooted at a directory.
///
/// Keys map to paths relative to the base directory and may be nested
/// (e.g., "index/metadata.json").
pub struct NativeStorage {
    base_path: PathBuf,
}

impl NativeStorage {
    /// Creates a NativeStorage rooted at `base_path`, creating the directory.
    pub fn with_path(base_path: PathBuf) -> Result<Self, StorageError> {
        std::fs::create_dir_all(&base_path)
            .map_err(|e| StorageError::IoError(format!("Failed to create directory: {}", e)))?;

        Ok(Self { base_path })
    }

    fn get_path(&self, key: &str) -> PathBuf {
        self.base_path.join(key)
    }

    fn temp_path(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_os_string();
        name.push(TEMP_SUFFIX);
        PathBuf::from(name)
    }

    /// Ensures parent directories exist for a given path.
    async fn ensure_parent_dirs(&self, path: &Path) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::IoError(format!("Failed to create directory: {}", e)))?;
        }
        Ok(())
    }

    /// Writes `data` to the temp sibling of `key`'s path and flushes it to disk.
    async fn stage(&self, key: &str, data: &[u8]) -> Result<(PathBuf, PathBuf), StorageError> {
        let path = self.get_path(key);
        self.ensure_parent_dirs(&path).await?;

        let temp = Self::temp_path(&path);
        let mut file = tokio::fs::File::create(&temp)
            .await
            .map_err(|e| StorageError::IoError(format!("Failed to create {}: {}", temp.display(), e)))?;
        file.write_all(data)
            .await
            .map_err(|e| StorageError::IoError(format!("Failed to write file: {}", e)))?;
        file.sync_all()
            .await
            .map_err(|e| StorageError::IoError(format!("Failed to sync file: {}", e)))?;

        Ok((temp, path))
    }

    async fn commit(temp: &Path, path: &Path) -> Result<(), StorageError> {
        tokio::fs::rename(temp, path).await.map_err(|e| {
            StorageError::IoError(format!("Failed to move {} into place: {}", path.display(), e))
        })
    }

    async fn discard(staged: &[(PathBuf, PathBuf)]) {
        for (temp, _) in staged {
            if let Err(e) = tokio::fs::remove_file(temp).await {
                debug!("Could not remove temp file {}: {}", temp.display(), e);
            }
        }
    }
}

#[async_trait::async_trait]
impl StorageBackend for NativeStorage {
    async fn save(&self, key: &str, data: &[u8]) -> Result<(), StorageError> {
        let (temp, path) = self.stage(key, data).await?;
        Self::commit(&temp, &path).await
    }

    async fn load(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.get_path(key);
        tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                StorageError::NotFound(key.to_string())
            } else {
                StorageError::IoError(format!("Failed to read file: {}", e))
            }
        })
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        tokio::fs::try_exists(self.get_path(key))
            .await
            .map_err(|e| StorageError::IoError(format!("Failed to stat file: {}", e)))
    }

    /// Stages every entry before renaming any of them into place.
    async fn save_batch(&self, entries: &[(&str, &[u8])]) -> Result<(), StorageError> {
        let mut staged = Vec::with_capacity(entries.len());
        for (key, data) in entries {
            match self.stage(key, data).await {
                Ok(pair) => staged.push(pair),
                Err(e) => {
                    Self::discard(&staged).await;
                    return Err(e);
                }
            }
        }

        for (temp, path) in &staged {
            Self::commit(temp, path).await?;
        }
        Ok(())
    }
}
