//! Document ingestion pipeline.
//!
//! This module turns a file path into vectors and chunk records ready to be
//! appended to the index:
//! - Extract text through the [`TextExtractor`](crate::extraction::TextExtractor)
//! - Chunk it with the configured [`ChunkConfig`](crate::chunking::ChunkConfig)
//! - Embed every chunk in one batch on the blocking pool
//!
//! The pipeline never touches the index itself. The engine appends a whole
//! batch of [`PreparedSource`]s under one write guard and then persists.
//!
//! # Example
//!
//! ```ignore
//! use scholar_core::processing::IngestionPipeline;
//!
//! let pipeline = IngestionPipeline::new(extractor, embedder, ChunkConfig::default());
//! if let Some(prepared) = pipeline.prepare(Path::new("notes.md"), None).await? {
//!     state.append(prepared.vectors, prepared.records)?;
//! }
//! ```

mod pipeline;

pub use pipeline::{embed_blocking, IngestReport, IngestionPipeline, PreparedSource};
