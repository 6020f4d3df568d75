//! # Scholar Core
//!
//! Semantic retrieval over a directory of study documents and a running
//! conversation log.
//!
//! Documents are extracted to text, split into overlapping character
//! windows, embedded with a sentence-embedding model and stored in an exact
//! L2 vector index alongside their metadata. The conversation log is a
//! tracked source: when it changes, its chunks are replaced by a filtered
//! rebuild of the index.
//!
//! ## Modules
//!
//! - [`search`] - Retrieval engine, flat vector index and chunk metadata
//! - [`storage`] - Storage backends and the two-artifact index format
//! - [`processing`] - Extract, chunk and embed pipeline
//! - [`extraction`] - Plain text, Markdown, PDF and DOCX text extraction
//! - [`embedding`] - Embedding trait, MiniLM model and a hashing fallback
//! - [`chunking`] - Fixed-size overlapping character windows
//! - [`history`] - Append-only conversation log
//! - [`config`] - Production constants and engine configuration
//! - [`error`] - Error types

pub mod chunking;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extraction;
pub mod history;
pub mod processing;
pub mod search;
pub mod storage;

pub use config::EngineConfig;
pub use error::{ConfigError, EngineError};
pub use history::ConversationLog;
pub use search::{format_context, RetrievalEngine, SearchHit};
