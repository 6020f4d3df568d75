//! Sentence embedding model implementation and inference.
//!
//! This module provides the MiniLM (BERT) sentence embedder using the Candle
//! ML framework: token-level hidden states are mean-pooled over the attention
//! mask and L2 normalized, matching sentence-transformers' output.

use super::config::{MiniLmConfig, ModelFiles};
use super::tokenizer::{EncodedBatch, TokenizerHandle};
use super::traits::Embedder;
use crate::error::EmbeddingError;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config};
use std::path::Path;
use tracing::{debug, info, instrument};

/// MiniLM sentence embedding model.
///
/// # Examples
///
/// ```ignore
/// let embedder = MiniLmEmbedder::from_dir(Path::new("models/all-MiniLM-L6-v2"), MiniLmConfig::default())?;
/// let vectors = embedder.embed_batch(&["a chunk of text".to_string()])?;
/// assert_eq!(vectors[0].len(), 384);
/// ```
pub struct MiniLmEmbedder {
    model: BertModel,
    tokenizer: TokenizerHandle,
    config: MiniLmConfig,
    device: Device,
}

impl MiniLmEmbedder {
    /// Loads weights, architecture and tokenizer from a model directory.
    ///
    /// # Errors
    ///
    /// Returns `EmbeddingError::ModelUnavailable` if any of the three files is
    /// missing or unreadable, and `EmbeddingError::ModelLoad` if they do not
    /// describe a usable model.
    pub fn from_dir(dir: &Path, config: MiniLmConfig) -> Result<Self, EmbeddingError> {
        let files = ModelFiles::in_dir(dir);
        let missing = files.missing();
        if !missing.is_empty() {
            let names: Vec<String> = missing.iter().map(|p| p.display().to_string()).collect();
            return Err(EmbeddingError::ModelUnavailable(format!(
                "missing model files: {}",
                names.join(", ")
            )));
        }

        let read = |path: &Path| {
            std::fs::read(path).map_err(|e| {
                EmbeddingError::ModelUnavailable(format!("Failed to read {}: {}", path.display(), e))
            })
        };

        let model_bytes = read(&files.weights)?;
        let config_bytes = read(&files.config)?;
        let tokenizer_bytes = read(&files.tokenizer)?;

        Self::from_bytes(model_bytes, &config_bytes, &tokenizer_bytes, config)
    }

    /// Creates a model from safetensors weights, `config.json` and `tokenizer.json` bytes.
    pub fn from_bytes(
        model_bytes: Vec<u8>,
        config_bytes: &[u8],
        tokenizer_bytes: &[u8],
        config: MiniLmConfig,
    ) -> Result<Self, EmbeddingError> {
        info!("Loading embedding model '{}'", config.model_id);
        info!(
            "Model bytes length: {} bytes ({:.2}MB)",
            model_bytes.len(),
            model_bytes.len() as f64 / 1_000_000.0
        );

        let bert_config: Config = serde_json::from_slice(config_bytes)
            .map_err(|e| EmbeddingError::ModelLoad(format!("Invalid config.json: {}", e)))?;

        let tokenizer = TokenizerHandle::from_bytes(tokenizer_bytes, config.max_sequence_length)?;
        let device = Self::select_device();
        let model = Self::create_model(model_bytes, &bert_config, &device)?;

        let embedder = Self {
            model,
            tokenizer,
            config,
            device,
        };

        // Output dimension must match the configured hidden size.
        let probe = embedder.embed_chunk(&["probe".to_string()])?;
        let actual = probe.first().map(Vec::len).unwrap_or(0);
        if actual != embedder.config.hidden_size {
            return Err(EmbeddingError::InvalidConfig(format!(
                "Model produces {}-dimensional embeddings, expected {}",
                actual, embedder.config.hidden_size
            )));
        }

        Ok(embedder)
    }

    /// Returns a reference to the config.
    pub fn config(&self) -> &MiniLmConfig {
        &self.config
    }

    /// Selects the best available compute device.
    pub fn select_device() -> Device {
        #[cfg(feature = "cuda")]
        {
            if let Ok(cuda_device) = Device::new_cuda(0) {
                info!("Using CUDA GPU");
                return cuda_device;
            }
        }

        #[cfg(feature = "metal")]
        {
            if let Ok(metal_device) = Device::new_metal(0) {
                info!("Using Metal GPU");
                return metal_device;
            }
        }

        info!("Using CPU");
        Device::Cpu
    }

    fn create_model(
        model_bytes: Vec<u8>,
        bert_config: &Config,
        device: &Device,
    ) -> Result<BertModel, EmbeddingError> {
        if model_bytes.len() < 8 {
            return Err(EmbeddingError::ModelLoad(
                "Model file too small".to_string(),
            ));
        }

        let vb = VarBuilder::from_buffered_safetensors(model_bytes, DType::F32, device)
            .map_err(|e| {
                EmbeddingError::ModelLoad(format!("Failed to create VarBuilder: {}", e))
            })?;

        let model = BertModel::load(vb, bert_config)
            .map_err(|e| EmbeddingError::ModelLoad(format!("Failed to create BertModel: {}", e)))?;
        info!("BertModel created successfully");

        Ok(model)
    }

    fn tensor(&self, data: &[u32], batch: &EncodedBatch) -> Result<Tensor, EmbeddingError> {
        Tensor::from_slice(data, (batch.batch_size, batch.seq_len), &self.device)
            .map_err(|e| EmbeddingError::TensorCreation(format!("Failed to create tensor: {}", e)))
    }

    /// Runs one forward pass over at most `batch_size` texts.
    fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let batch = self.tokenizer.encode_batch(texts)?;
        if batch.seq_len == 0 {
            return Err(EmbeddingError::TokenizationFailed(
                "Tokenizer returned no tokens".to_string(),
            ));
        }

        let input_ids = self.tensor(&batch.input_ids, &batch)?;
        let type_ids = self.tensor(&batch.type_ids, &batch)?;
        let attention_mask = self.tensor(&batch.attention_mask, &batch)?;

        // [batch, seq_len] -> [batch, seq_len, hidden]
        let hidden = self
            .model
            .forward(&input_ids, &type_ids, Some(&attention_mask))
            .map_err(|e| EmbeddingError::InferenceFailed(format!("Forward pass failed: {}", e)))?;

        let pooled = mean_pool(&hidden, &attention_mask)?;
        let output = if self.config.normalize_embeddings {
            normalize_l2(&pooled)?
        } else {
            pooled
        };

        output
            .to_vec2::<f32>()
            .map_err(|e| EmbeddingError::InferenceFailed(format!("Failed to convert to vec: {}", e)))
    }
}

/// Averages hidden states over the positions the attention mask keeps.
fn mean_pool(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor, EmbeddingError> {
    let failed =
        |e: candle_core::Error| EmbeddingError::InferenceFailed(format!("Mean pooling failed: {}", e));

    let mask = attention_mask
        .to_dtype(DType::F32)
        .and_then(|m| m.unsqueeze(2))
        .map_err(failed)?;
    let summed = hidden
        .broadcast_mul(&mask)
        .and_then(|t| t.sum(1))
        .map_err(failed)?;
    let counts = mask.sum(1).map_err(failed)?;
    summed.broadcast_div(&counts).map_err(failed)
}

/// Applies L2 normalization to create unit vectors.
fn normalize_l2(v: &Tensor) -> Result<Tensor, EmbeddingError> {
    let failed =
        |e: candle_core::Error| EmbeddingError::InferenceFailed(format!("Failed to normalize: {}", e));

    let norms = v
        .sqr()
        .and_then(|t| t.sum_keepdim(1))
        .and_then(|t| t.sqrt())
        .map_err(failed)?;
    v.broadcast_div(&norms).map_err(failed)
}

impl Embedder for MiniLmEmbedder {
    fn model_id(&self) -> &str {
        &self.config.model_id
    }

    fn embedding_dim(&self) -> usize {
        self.config.hidden_size
    }

    #[instrument(skip_all, fields(texts = texts.len()))]
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.config.batch_size.max(1)) {
            vectors.extend(self.embed_chunk(chunk)?);
        }
        debug!("Embedded {} texts", vectors.len());

        if vectors.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                actual: vectors.len(),
            });
        }
        Ok(vectors)
    }
}
