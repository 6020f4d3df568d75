//! Traits for embedding operations.

use crate::error::EmbeddingError;

/// Trait for text embedding models.
///
/// Implementations map text to fixed-dimension vectors deterministically:
/// the same input always produces the same vector, and no call mutates
/// external state. This lets the engine re-embed surviving chunks during a
/// selective rebuild and get the vectors it had before.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`. The engine shares one embedder
/// behind an `Arc` and calls it from tokio's blocking pool.
///
/// # Examples
///
/// ```
/// use scholar_core::embedding::{Embedder, HashingEmbedder};
///
/// let embedder = HashingEmbedder::new(64);
/// let vectors = embedder
///     .embed_batch(&["first chunk".to_string(), "second chunk".to_string()])
///     .unwrap();
/// assert_eq!(vectors.len(), 2);
/// assert_eq!(vectors[0].len(), embedder.embedding_dim());
/// ```
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g., "sentence-transformers/all-MiniLM-L6-v2").
    fn model_id(&self) -> &str;

    /// Returns the embedding dimension (vector size).
    ///
    /// All embeddings from this model will have this length.
    fn embedding_dim(&self) -> usize;

    /// Generates embeddings for a batch of texts, one vector per input, in order.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Generates the embedding for a single text.
    fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.embed_batch(&[text.to_string()])?;
        if vectors.len() != 1 {
            return Err(EmbeddingError::CountMismatch {
                expected: 1,
                actual: vectors.len(),
            });
        }
        vectors
            .pop()
            .ok_or(EmbeddingError::CountMismatch {
                expected: 1,
                actual: 0,
            })
    }
}
