//! Text chunking.
//!
//! Extracted text is split into overlapping fixed-size character windows
//! before embedding. See [`FixedSizeChunker`] for the exact windowing rule.

mod fixed;
mod types;

pub use fixed::FixedSizeChunker;
pub use types::{ChunkConfig, TextChunk};

/// Chunks `text` with `config`, returning positioned chunks.
pub fn chunk_text(text: &str, config: &ChunkConfig) -> Vec<TextChunk> {
    FixedSizeChunker::new(*config).chunk(text)
}

/// Chunks `text` with `config`, returning only the chunk texts.
pub fn chunk_strings(text: &str, config: &ChunkConfig) -> Vec<String> {
    chunk_text(text, config)
        .into_iter()
        .map(|chunk| chunk.text)
        .collect()
}
