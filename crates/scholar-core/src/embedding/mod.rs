//! Embedding model abstractions and implementations.
//!
//! ## Core Trait
//!
//! - [`Embedder`] - batched, deterministic text-to-vector interface
//!
//! ## Implementations
//!
//! - [`MiniLmEmbedder`] - all-MiniLM-L6-v2 sentence embeddings using Candle
//! - [`HashingEmbedder`] - model-free feature hashing for offline use and tests
//! - [`TokenizerHandle`] - Wrapper for HuggingFace tokenizers
//!
//! ## Example
//!
//! ```ignore
//! use scholar_core::embedding::{Embedder, MiniLmConfig, MiniLmEmbedder};
//!
//! let embedder = MiniLmEmbedder::from_dir(Path::new("models/minilm"), MiniLmConfig::default())?;
//! let vectors = embedder.embed_batch(&["Hello, world!".to_string()])?;
//! ```

mod traits;

pub mod config;
pub mod hashing;
pub mod model;
pub mod tokenizer;

pub use traits::Embedder;

pub use config::{MiniLmConfig, ModelFiles};
pub use hashing::HashingEmbedder;
pub use model::MiniLmEmbedder;
pub use tokenizer::{EncodedBatch, TokenizerHandle};
