//! Configuration for embedding models.

use crate::config::{DEFAULT_MODEL_ID, EMBEDDING_DIM, MAX_SEQUENCE_TOKENS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Weights file expected in a model directory.
pub const MODEL_FILENAME: &str = "model.safetensors";
/// Architecture file (Hugging Face `config.json`) expected in a model directory.
pub const MODEL_CONFIG_FILENAME: &str = "config.json";
/// Tokenizer file expected in a model directory.
pub const TOKENIZER_FILENAME: &str = "tokenizer.json";

/// Runtime settings for the MiniLM sentence embedder.
///
/// The transformer architecture itself (hidden size, layers, heads) comes
/// from the model directory's `config.json`; these are the settings that
/// wrap inference.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MiniLmConfig {
    /// Model identifier (e.g., "sentence-transformers/all-MiniLM-L6-v2")
    pub model_id: String,

    /// Expected output dimension; checked against `config.json` at load
    pub hidden_size: usize,

    /// Tokens kept per input before truncation
    pub max_sequence_length: usize,

    /// Whether to apply L2 normalization to embeddings
    pub normalize_embeddings: bool,

    /// Inputs per forward pass
    pub batch_size: usize,
}

impl Default for MiniLmConfig {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            hidden_size: EMBEDDING_DIM,
            max_sequence_length: MAX_SEQUENCE_TOKENS,
            normalize_embeddings: true,
            batch_size: 32,
        }
    }
}

/// Resolved file locations of a model directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelFiles {
    pub weights: PathBuf,
    pub config: PathBuf,
    pub tokenizer: PathBuf,
}

impl ModelFiles {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            weights: dir.join(MODEL_FILENAME),
            config: dir.join(MODEL_CONFIG_FILENAME),
            tokenizer: dir.join(TOKENIZER_FILENAME),
        }
    }

    /// Files that do not exist on disk.
    pub fn missing(&self) -> Vec<&Path> {
        [&self.weights, &self.config, &self.tokenizer]
            .into_iter()
            .filter(|path| !path.exists())
            .map(PathBuf::as_path)
            .collect()
    }
}
