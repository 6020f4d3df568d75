//! Types for text chunking.

use crate::config::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::error::ChunkingError;
use serde::{Deserialize, Serialize};

/// A chunk of text with metadata about its position in the source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Index of this chunk in the document (0-based)
    pub index: usize,
    /// The trimmed text content of this chunk
    pub text: String,
    /// Character offset where this chunk's window starts in the original document
    pub start_char: usize,
    /// Character offset where this chunk's window ends in the original document
    pub end_char: usize,
}

/// Window size and overlap, both measured in characters.
///
/// Construction enforces `0 < overlap + 1 <= chunk_size`, so a chunker built
/// from a `ChunkConfig` always makes forward progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkConfig {
    chunk_size: usize,
    overlap: usize,
}

impl ChunkConfig {
    /// # Errors
    ///
    /// Returns `ChunkingError::InvalidConfig` if `chunk_size` is zero or
    /// `overlap >= chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ChunkingError> {
        if chunk_size == 0 || overlap >= chunk_size {
            return Err(ChunkingError::InvalidConfig {
                chunk_size,
                overlap,
            });
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Distance between the starts of consecutive windows. Always positive.
    pub fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}
