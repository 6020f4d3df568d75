//! Semantic retrieval over an append-only flat vector index.
//!
//! # Architecture
//!
//! - `types`: Core types (ChunkRecord, SearchHit, SourceVersion, IndexError)
//! - `vector`: Exact L2 nearest-neighbor index with a binary on-disk form
//! - `metadata`: Chunk records aligned 1:1 with vector ordinals
//! - `state`: Index, metadata and tracked-source table as one unit
//! - `engine`: RetrievalEngine orchestrating ingestion, change tracking and search
//! - `context`: Formatting hits as a grounding block for a language model
//!
//! # Usage
//!
//! ```ignore
//! use scholar_core::search::RetrievalEngine;
//! use scholar_core::EngineConfig;
//!
//! let engine = RetrievalEngine::open(EngineConfig::new("/data"), embedder)?;
//! engine.initialize().await?;
//!
//! let hits = engine.search("How do mitochondria make ATP?", 3).await?;
//! println!("{}", format_context(&hits));
//! ```
//!
//! # Algorithm Details
//!
//! **Vector search**:
//! - Brute-force Euclidean distance over every stored vector
//! - Results sorted by ascending distance, ties broken by insertion order
//! - `similarity = 1 / (1 + distance)` for presentation
//!
//! **Updates**:
//! - Write-once sources are appended
//! - Tracked sources are replaced through a filtered rebuild of the whole
//!   index, O(total chunks) per update

pub mod context;
pub mod metadata;
pub mod state;
pub mod types;
pub mod vector;

mod engine;

pub use context::{format_context, CONTEXT_HEADER};
pub use engine::{
    IndexStats, InitReport, LoadSummary, RetrievalEngine, SourceStatus, TrackedAction,
    TrackedUpdate,
};
pub use metadata::MetadataStore;
pub use state::IndexState;
pub use types::{
    similarity_from_distance, validate_dimension, ChunkRecord, IndexError, SearchHit,
    SourceVersion,
};
pub use vector::FlatL2Index;
