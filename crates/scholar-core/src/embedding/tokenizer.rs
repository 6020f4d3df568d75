//! Tokenization utilities for text processing.
//!
//! This module provides the `TokenizerHandle` type for managing HuggingFace
//! tokenizers with truncation and batch padding configured.

use crate::error::EmbeddingError;
use tokenizers::tokenizer::{Tokenizer, TruncationDirection, TruncationParams, TruncationStrategy};
use tokenizers::{PaddingParams, PaddingStrategy};

/// Token ids, attention mask and segment ids for a padded batch, flattened
/// row-major as `[batch_size, seq_len]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBatch {
    pub input_ids: Vec<u32>,
    pub attention_mask: Vec<u32>,
    pub type_ids: Vec<u32>,
    pub batch_size: usize,
    pub seq_len: usize,
}

/// Handle for a configured tokenizer.
///
/// Wraps a HuggingFace tokenizer with truncation to `max_length` tokens and
/// padding to the longest sequence of each batch.
#[derive(Clone)]
pub struct TokenizerHandle {
    tokenizer: Tokenizer,
}

impl TokenizerHandle {
    /// Creates a tokenizer from JSON bytes with truncation and padding configured.
    ///
    /// # Errors
    ///
    /// Returns `EmbeddingError::TokenizerUnavailable` if the bytes are not a
    /// tokenizer, or `EmbeddingError::InvalidConfig` if truncation cannot be set.
    pub fn from_bytes(tokenizer_bytes: &[u8], max_length: usize) -> Result<Self, EmbeddingError> {
        let mut tokenizer = Tokenizer::from_bytes(tokenizer_bytes).map_err(|e| {
            EmbeddingError::TokenizerUnavailable(format!("Failed to deserialize tokenizer: {}", e))
        })?;

        configure_truncation(&mut tokenizer, max_length)?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..Default::default()
        }));

        Ok(Self { tokenizer })
    }

    /// Tokenizes a batch of texts into one padded rectangle.
    ///
    /// # Errors
    ///
    /// Returns `EmbeddingError::TokenizationFailed` if encoding fails.
    pub fn encode_batch(&self, texts: &[String]) -> Result<EncodedBatch, EmbeddingError> {
        let inputs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let encodings = self
            .tokenizer
            .encode_batch(inputs, true)
            .map_err(|e| EmbeddingError::TokenizationFailed(format!("Encoding failed: {}", e)))?;

        let seq_len = encodings.first().map(|e| e.get_ids().len()).unwrap_or(0);
        let batch_size = encodings.len();
        let mut batch = EncodedBatch {
            input_ids: Vec::with_capacity(batch_size * seq_len),
            attention_mask: Vec::with_capacity(batch_size * seq_len),
            type_ids: Vec::with_capacity(batch_size * seq_len),
            batch_size,
            seq_len,
        };

        for encoding in &encodings {
            if encoding.get_ids().len() != seq_len {
                return Err(EmbeddingError::TokenizationFailed(
                    "Batch padding produced ragged sequences".to_string(),
                ));
            }
            batch.input_ids.extend_from_slice(encoding.get_ids());
            batch
                .attention_mask
                .extend_from_slice(encoding.get_attention_mask());
            batch.type_ids.extend_from_slice(encoding.get_type_ids());
        }

        Ok(batch)
    }
}

/// Configures tokenizer with truncation settings.
fn configure_truncation(
    tokenizer: &mut Tokenizer,
    max_length: usize,
) -> Result<(), EmbeddingError> {
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            stride: 0,
            strategy: TruncationStrategy::LongestFirst,
            direction: TruncationDirection::Right,
        }))
        .map_err(|e| {
            EmbeddingError::InvalidConfig(format!(
                "Failed to configure tokenizer truncation: {}",
                e
            ))
        })?;

    Ok(())
}
