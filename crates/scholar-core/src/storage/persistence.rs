//! On-disk format of the index: two co-located artifacts.
//!
//! - `vectors.bin`: the vector index in its binary form (see
//!   [`FlatL2Index::to_bytes`]), stamped with a generation number
//! - `metadata.json`: schema version, dimension, the same generation number,
//!   the ordered chunk records and the tracked-source table
//!
//! Both are written through [`StorageBackend::save_batch`]. On load, the
//! artifacts must agree on dimension, count and generation; any disagreement
//! is reported as [`LoadOutcome::Corrupt`] rather than an error, and callers
//! start from an empty index.

use super::{StorageBackend, StorageError};
use crate::config::{METADATA_FILENAME, VECTORS_FILENAME};
use crate::search::metadata::MetadataStore;
use crate::search::state::IndexState;
use crate::search::types::{get_current_timestamp, SourceVersion};
use crate::search::vector::FlatL2Index;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Current schema version of the metadata artifact.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Contents of `metadata.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedMetadata {
    /// Schema version that wrote this file
    pub schema_version: u32,
    /// Minimum schema version required to read this file
    pub min_compatible_version: u32,
    /// Embedder that produced the vectors; empty if unknown
    #[serde(default)]
    pub model_id: String,
    pub embedding_dimension: usize,
    /// Must equal the generation in `vectors.bin`
    pub generation: u64,
    /// Unix seconds
    pub saved_at: u64,
    pub chunk_count: usize,
    pub chunks: MetadataStore,
    #[serde(default)]
    pub tracked_sources: Vec<SourceVersion>,
}

impl PersistedMetadata {
    fn from_state(state: &IndexState, model_id: &str) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            min_compatible_version: 1,
            model_id: model_id.to_string(),
            embedding_dimension: state.dimension(),
            generation: state.generation(),
            saved_at: get_current_timestamp(),
            chunk_count: state.len(),
            chunks: state.metadata().clone(),
            tracked_sources: state.tracked_sources(),
        }
    }

    /// Checks if this version of the crate can read the file.
    pub fn is_compatible(&self) -> bool {
        CURRENT_SCHEMA_VERSION >= self.min_compatible_version
    }
}

/// Result of attempting to load a persisted index.
pub enum LoadOutcome {
    /// No index has been saved yet
    NotFound,
    /// Both artifacts loaded and agree with each other
    Loaded(IndexState),
    /// Index is readable but was written for another schema or model
    Incompatible { reason: String },
    /// One artifact is missing, unreadable, or disagrees with the other
    Corrupt { reason: String },
}

/// Saves and loads [`IndexState`] through a [`StorageBackend`].
///
/// Vectors are only comparable within one embedding model, so the store is
/// bound to a model id and rejects indexes written by another model.
pub struct IndexStore<S> {
    storage: S,
    model_id: String,
}

impl<S: StorageBackend> IndexStore<S> {
    pub fn new(storage: S, model_id: impl Into<String>) -> Self {
        Self {
            storage,
            model_id: model_id.into(),
        }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Writes both artifacts for `state`.
    #[instrument(skip_all, fields(chunks = state.len(), generation = state.generation()))]
    pub async fn save(&self, state: &IndexState) -> Result<(), StorageError> {
        let metadata = PersistedMetadata::from_state(state, &self.model_id);
        let metadata_json = serde_json::to_vec_pretty(&metadata).map_err(|e| {
            StorageError::SerializationError(format!("Failed to serialize metadata: {}", e))
        })?;
        let vectors_bin = state.index().to_bytes(state.generation());

        self.storage
            .save_batch(&[
                (VECTORS_FILENAME, vectors_bin.as_slice()),
                (METADATA_FILENAME, metadata_json.as_slice()),
            ])
            .await?;

        info!(
            "Saved index: {} chunks, generation {}",
            state.len(),
            state.generation()
        );
        Ok(())
    }

    /// Loads both artifacts and validates them against each other and
    /// against `expected_dim`.
    #[instrument(skip(self))]
    pub async fn load(&self, expected_dim: usize) -> LoadOutcome {
        let has_vectors = self.storage.exists(VECTORS_FILENAME).await;
        let has_metadata = self.storage.exists(METADATA_FILENAME).await;

        match (has_vectors, has_metadata) {
            (Ok(false), Ok(false)) => return LoadOutcome::NotFound,
            (Ok(true), Ok(true)) => {}
            (Ok(vectors), Ok(_)) => {
                let missing = if vectors {
                    METADATA_FILENAME
                } else {
                    VECTORS_FILENAME
                };
                return corrupt(format!("{} is missing", missing));
            }
            (Err(e), _) | (_, Err(e)) => return corrupt(format!("cannot stat index: {}", e)),
        }

        let metadata_bytes = match self.storage.load(METADATA_FILENAME).await {
            Ok(bytes) => bytes,
            Err(e) => return corrupt(format!("cannot read {}: {}", METADATA_FILENAME, e)),
        };
        let metadata: PersistedMetadata = match serde_json::from_slice(&metadata_bytes) {
            Ok(metadata) => metadata,
            Err(e) => return corrupt(format!("cannot parse {}: {}", METADATA_FILENAME, e)),
        };

        if !metadata.is_compatible() {
            return LoadOutcome::Incompatible {
                reason: format!(
                    "Index requires schema version >= {}, this build has version {}",
                    metadata.min_compatible_version, CURRENT_SCHEMA_VERSION
                ),
            };
        }
        if !metadata.model_id.is_empty() && metadata.model_id != self.model_id {
            return LoadOutcome::Incompatible {
                reason: format!(
                    "Index was built with {}, current model is {}",
                    metadata.model_id, self.model_id
                ),
            };
        }
        if metadata.embedding_dimension != expected_dim {
            return LoadOutcome::Incompatible {
                reason: format!(
                    "Embedding dimension mismatch: index has {}, expected {}",
                    metadata.embedding_dimension, expected_dim
                ),
            };
        }

        let vector_bytes = match self.storage.load(VECTORS_FILENAME).await {
            Ok(bytes) => bytes,
            Err(e) => return corrupt(format!("cannot read {}: {}", VECTORS_FILENAME, e)),
        };
        let (index, generation) = match FlatL2Index::from_bytes(&vector_bytes) {
            Ok(parsed) => parsed,
            Err(e) => return corrupt(format!("cannot parse {}: {}", VECTORS_FILENAME, e)),
        };

        if index.dimension() != metadata.embedding_dimension {
            return corrupt(format!(
                "{} has dimension {}, {} declares {}",
                VECTORS_FILENAME,
                index.dimension(),
                METADATA_FILENAME,
                metadata.embedding_dimension
            ));
        }
        if generation != metadata.generation {
            return corrupt(format!(
                "generation mismatch: {} is at {}, {} is at {}",
                VECTORS_FILENAME, generation, METADATA_FILENAME, metadata.generation
            ));
        }
        if metadata.chunk_count != metadata.chunks.len() {
            return corrupt(format!(
                "{} declares {} chunks but lists {}",
                METADATA_FILENAME,
                metadata.chunk_count,
                metadata.chunks.len()
            ));
        }

        let sources = metadata
            .tracked_sources
            .into_iter()
            .map(|v| (v.source_path, v.mtime))
            .collect();

        match IndexState::from_parts(index, metadata.chunks, sources, generation) {
            Ok(state) => {
                info!(
                    "Loaded index: {} chunks, generation {}",
                    state.len(),
                    state.generation()
                );
                LoadOutcome::Loaded(state)
            }
            Err(e) => corrupt(e.to_string()),
        }
    }
}

fn corrupt(reason: String) -> LoadOutcome {
    LoadOutcome::Corrupt { reason }
}
