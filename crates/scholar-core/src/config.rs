//! Production configuration constants and engine configuration.
//!
//! The constants here define the defaults used by the engine, the CLI and the
//! benchmarks. [`EngineConfig`] bundles the values a [`RetrievalEngine`]
//! needs and validates them once, at construction.
//!
//! # Usage
//!
//! ```
//! use scholar_core::config::{EngineConfig, EMBEDDING_DIM};
//!
//! let config = EngineConfig::new("/tmp/scholar-data")
//!     .with_chunking(400, 50);
//! assert!(config.validate().is_ok());
//! assert_eq!(config.embedding_dim, EMBEDDING_DIM);
//! ```
//!
//! [`RetrievalEngine`]: crate::search::RetrievalEngine

use crate::chunking::ChunkConfig;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// =============================================================================
// Embedding Model Configuration
// =============================================================================

/// Embedding vector dimension (all-MiniLM-L6-v2 hidden size).
pub const EMBEDDING_DIM: usize = 384;

/// Hugging Face identifier of the default sentence-embedding model.
pub const DEFAULT_MODEL_ID: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Token limit applied by the tokenizer before inference.
pub const MAX_SEQUENCE_TOKENS: usize = 256;

// =============================================================================
// Text Chunking Configuration
// =============================================================================

/// Characters per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 800;

/// Characters shared between consecutive chunks.
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

// =============================================================================
// Retrieval
// =============================================================================

/// Number of hits used to ground a response when the caller does not choose.
pub const DEFAULT_SEARCH_K: usize = 3;

/// Upper bound on a selective rebuild before it is abandoned and retried later.
pub const DEFAULT_REBUILD_TIMEOUT: Duration = Duration::from_secs(300);

// =============================================================================
// Data Directory Layout
// =============================================================================

/// The continuously appended conversation log, tracked for modification.
pub const HISTORY_FILENAME: &str = "history.txt";

/// Binary vector artifact, co-located with [`METADATA_FILENAME`].
pub const VECTORS_FILENAME: &str = "vectors.bin";

/// Serialized chunk records and tracked-source table.
pub const METADATA_FILENAME: &str = "metadata.json";

/// Sub-directory of the data directory holding the persisted index.
pub const INDEX_DIRNAME: &str = "index";

/// File extensions (lowercase, no dot) picked up by the data directory scan.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "txt", "md", "markdown", "docx"];

/// Returns `true` if the path has one of the [`SUPPORTED_EXTENSIONS`].
pub fn is_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Everything a retrieval engine needs to know about its environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory scanned for documents and used to materialize inline notes.
    pub data_dir: PathBuf,
    /// Directory holding the persisted index artifacts.
    pub index_dir: PathBuf,
    /// Expected embedding dimension; must match the embedder.
    pub embedding_dim: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Mutable sources whose modification time is tracked across runs.
    pub tracked_sources: Vec<PathBuf>,
    #[serde(with = "duration_secs")]
    pub rebuild_timeout: Duration,
}

impl EngineConfig {
    /// Default configuration rooted at `data_dir`: index under
    /// `data_dir/index`, tracking `data_dir/history.txt`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            index_dir: data_dir.join(INDEX_DIRNAME),
            tracked_sources: vec![data_dir.join(HISTORY_FILENAME)],
            data_dir,
            embedding_dim: EMBEDDING_DIM,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            rebuild_timeout: DEFAULT_REBUILD_TIMEOUT,
        }
    }

    pub fn with_index_dir(mut self, index_dir: impl Into<PathBuf>) -> Self {
        self.index_dir = index_dir.into();
        self
    }

    pub fn with_embedding_dim(mut self, embedding_dim: usize) -> Self {
        self.embedding_dim = embedding_dim;
        self
    }

    pub fn with_chunking(mut self, chunk_size: usize, chunk_overlap: usize) -> Self {
        self.chunk_size = chunk_size;
        self.chunk_overlap = chunk_overlap;
        self
    }

    pub fn with_tracked_sources(mut self, tracked_sources: Vec<PathBuf>) -> Self {
        self.tracked_sources = tracked_sources;
        self
    }

    pub fn with_rebuild_timeout(mut self, rebuild_timeout: Duration) -> Self {
        self.rebuild_timeout = rebuild_timeout;
        self
    }

    /// Path of the conversation log (the first tracked source, or the
    /// default `history.txt` when none are tracked).
    pub fn history_path(&self) -> PathBuf {
        self.tracked_sources
            .first()
            .cloned()
            .unwrap_or_else(|| self.data_dir.join(HISTORY_FILENAME))
    }

    /// Validated chunking parameters.
    pub fn chunk_config(&self) -> Result<ChunkConfig, ConfigError> {
        Ok(ChunkConfig::new(self.chunk_size, self.chunk_overlap)?)
    }

    /// Checks every value that would otherwise fail later, per call.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.chunk_config()?;
        if self.embedding_dim == 0 {
            return Err(ConfigError::ZeroDimension);
        }
        if self.rebuild_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChunkingError;

    #[test]
    fn test_embedding_dim_matches_minilm() {
        assert_eq!(EMBEDDING_DIM, 384);
    }

    #[test]
    fn test_default_chunking_is_valid() {
        let config = EngineConfig::new("/data");
        assert!(config.validate().is_ok());
        assert_eq!(config.chunk_size, 800);
        assert_eq!(config.chunk_overlap, 100);
    }

    #[test]
    fn test_default_layout() {
        let config = EngineConfig::new("/data");
        assert_eq!(config.index_dir, PathBuf::from("/data/index"));
        assert_eq!(
            config.tracked_sources,
            vec![PathBuf::from("/data/history.txt")]
        );
        assert_eq!(config.history_path(), PathBuf::from("/data/history.txt"));
    }

    #[test]
    fn test_overlap_equal_to_chunk_size_rejected() {
        let config = EngineConfig::new("/data").with_chunking(800, 800);
        assert_eq!(
            config.validate(),
            Err(ConfigError::Chunking(ChunkingError::InvalidConfig {
                chunk_size: 800,
                overlap: 800
            }))
        );
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let config = EngineConfig::new("/data").with_embedding_dim(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroDimension));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = EngineConfig::new("/data").with_rebuild_timeout(Duration::ZERO);
        assert_eq!(config.validate(), Err(ConfigError::ZeroTimeout));
    }

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported_extension(Path::new("notes.md")));
        assert!(is_supported_extension(Path::new("paper.PDF")));
        assert!(is_supported_extension(Path::new("essay.docx")));
        assert!(!is_supported_extension(Path::new("image.png")));
        assert!(!is_supported_extension(Path::new("README")));
    }

    #[test]
    fn test_config_serializes_timeout_as_seconds() {
        let config = EngineConfig::new("/data").with_rebuild_timeout(Duration::from_secs(42));
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"rebuild_timeout\":42"));
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.rebuild_timeout, Duration::from_secs(42));
    }
}
