//! Error types for scholar-core.
//!
//! Component errors (embedding, chunking, extraction) are recoverable at the
//! level of a single file. [`EngineError`] is what the public engine
//! operations return.

use crate::search::types::IndexError;
use crate::storage::StorageError;
use thiserror::Error;

/// Errors that can occur during embedding operations.
#[derive(Debug, Clone, Error)]
pub enum EmbeddingError {
    /// Failed to load model weights or config
    #[error("Failed to load model: {0}")]
    ModelLoad(String),
    /// Failed to create tensor during inference
    #[error("Failed to create tensor: {0}")]
    TensorCreation(String),
    /// Forward pass through the model failed
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    /// Failed to tokenize text
    #[error("Tokenization failed: {0}")]
    TokenizationFailed(String),
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    /// Tokenizer not available or initialization failed
    #[error("Tokenizer unavailable: {0}")]
    TokenizerUnavailable(String),
    /// Model not available or initialization failed
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),
    /// Model returned a different number of vectors than inputs
    #[error("Embedding count mismatch: {expected} inputs, {actual} vectors")]
    CountMismatch { expected: usize, actual: usize },
}

/// Errors that can occur during text chunking.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChunkingError {
    /// Invalid chunking configuration
    #[error("Invalid chunking config: chunk_size={chunk_size}, overlap={overlap} (overlap must be smaller than chunk_size, chunk_size must be positive)")]
    InvalidConfig { chunk_size: usize, overlap: usize },
}

/// Errors raised while turning a file into plain text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Failed to read file
    #[error("Failed to read {path}: {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// PDF parser rejected the file
    #[error("PDF extraction failed for {path}: {reason}")]
    Pdf { path: String, reason: String },
    /// DOCX archive could not be opened or lacks a document part
    #[error("DOCX extraction failed for {path}: {reason}")]
    Docx { path: String, reason: String },
    /// Blocking extraction task did not complete
    #[error("Extraction task failed: {0}")]
    TaskFailed(String),
}

/// Engine configuration errors, fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Chunking(#[from] ChunkingError),
    #[error("Embedding dimension must be positive")]
    ZeroDimension,
    #[error("Embedder produces {embedder}-dimensional vectors but the index expects {configured}")]
    DimensionDisagreement { configured: usize, embedder: usize },
    #[error("Rebuild timeout must be non-zero")]
    ZeroTimeout,
}

/// Errors returned by [`RetrievalEngine`](crate::search::RetrievalEngine) operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Invalid engine configuration
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
    /// Embedding model missing or failing; aborts the current call
    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(#[from] EmbeddingError),
    /// Persistence backend failure
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    /// Vector index rejected an operation
    #[error("Index error: {0}")]
    Index(#[from] IndexError),
    /// Persisted artifacts are inconsistent or unreadable
    #[error("Index corrupt: {0}")]
    IndexCorrupt(String),
    /// Caller-supplied query is unusable
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    /// A selective rebuild exceeded its time bound
    #[error("Rebuild of {source_path} timed out after {seconds}s")]
    Timeout { source_path: String, seconds: u64 },
    /// A blocking worker task panicked or was cancelled
    #[error("Worker task failed: {0}")]
    Worker(String),
    /// Text extraction failed where it cannot be skipped (inline notes)
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),
    /// Writing an inline note or log entry failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tokio::task::JoinError> for EngineError {
    fn from(err: tokio::task::JoinError) -> Self {
        EngineError::Worker(err.to_string())
    }
}
