//! Fixed-size character window chunking.
//!
//! Splits text into windows of `chunk_size` characters, each starting
//! `chunk_size - overlap` characters after the previous one. Windows are cut
//! on character (not byte) boundaries, so multi-byte text never splits inside
//! a code point.

use super::{ChunkConfig, TextChunk};

/// Fixed-size chunking with overlap.
///
/// # Algorithm
///
/// 1. Start a window at character 0
/// 2. Emit the window's text, trimmed
/// 3. Stop if the window reached the end of the text, otherwise advance by
///    `chunk_size - overlap`
///
/// For a text of `L` characters this yields `ceil((L - O) / (C - O))` windows
/// when `L > C`, and exactly one when `0 < L <= C`. A window whose trimmed text
/// is empty (a long run of whitespace) is not emitted.
///
/// # Examples
///
/// ```
/// use scholar_core::chunking::{ChunkConfig, FixedSizeChunker};
///
/// let chunker = FixedSizeChunker::new(ChunkConfig::new(10, 2).unwrap());
/// let chunks = chunker.chunk("abcdefghijklmnopqrstuvwxyz");
/// assert_eq!(chunks.len(), 3);
/// assert_eq!(chunks[1].text, "ijklmnopqr");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedSizeChunker {
    config: ChunkConfig,
}

impl FixedSizeChunker {
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> ChunkConfig {
        self.config
    }

    pub fn chunk(&self, text: &str) -> Vec<TextChunk> {
        if text.trim().is_empty() {
            return vec![];
        }

        // Byte offset of every char boundary, plus the end of the text.
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(offset, _)| offset)
            .chain(std::iter::once(text.len()))
            .collect();
        let char_count = boundaries.len() - 1;

        let chunk_size = self.config.chunk_size();
        let step = self.config.step();

        let mut chunks = Vec::new();
        let mut start = 0;

        while start < char_count {
            let end = (start + chunk_size).min(char_count);
            let window = text[boundaries[start]..boundaries[end]].trim();

            if !window.is_empty() {
                chunks.push(TextChunk {
                    index: chunks.len(),
                    text: window.to_string(),
                    start_char: start,
                    end_char: end,
                });
            }

            if end >= char_count {
                break;
            }
            start += step;
        }

        chunks
    }

    /// Texts of [`chunk`](Self::chunk), without offsets.
    pub fn chunk_strings(&self, text: &str) -> Vec<String> {
        self.chunk(text).into_iter().map(|chunk| chunk.text).collect()
    }
}
