//! Storage backends for persisting the search index.
//!
//! # Storage Abstractions
//!
//! [`StorageBackend`] is a key-value blob store. [`IndexStore`] sits on top
//! of it and owns the on-disk format of the index: a binary vector artifact
//! and a JSON metadata artifact, written together and validated against each
//! other on load.
//!
//! # Implementations
//!
//! - [`InMemoryStorage`] - process-local map, for tests and ephemeral engines
//! - [`NativeStorage`] - filesystem directory with temp-file-then-rename writes

mod native;
mod persistence;

pub use native::NativeStorage;
pub use persistence::{IndexStore, LoadOutcome, PersistedMetadata, CURRENT_SCHEMA_VERSION};

use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

/// Storage backend abstraction for persistence.
///
/// Keys are relative names such as `"metadata.json"`.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Save binary data to storage with a key.
    #[must_use = "Storage save failures should be handled"]
    async fn save(&self, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Load binary data from storage by key.
    #[must_use = "Storage load failures should be handled"]
    async fn load(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Check if a key exists in storage.
    #[must_use = "Storage check failures should be handled"]
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Save several entries together.
    ///
    /// Backends that can stage writes should make every entry fully written
    /// before any of them replaces its previous value. The default saves
    /// entries one after another.
    #[must_use = "Storage save failures should be handled"]
    async fn save_batch(&self, entries: &[(&str, &[u8])]) -> Result<(), StorageError> {
        for (key, data) in entries {
            self.save(key, data).await?;
        }
        Ok(())
    }
}

/// Storage error types.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Key not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// In-memory storage backend.
///
/// Data lives as long as the value does. Useful for testing or when
/// persistence is disabled.
#[derive(Default)]
pub struct InMemoryStorage {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>, StorageError> {
        self.entries
            .lock()
            .map_err(|_| StorageError::IoError("in-memory storage lock poisoned".to_string()))
    }
}

#[async_trait::async_trait]
impl StorageBackend for InMemoryStorage {
    async fn save(&self, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.entries()?.insert(key.to_string(), data.to_vec());
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.entries()?
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.entries()?.contains_key(key))
    }
}
