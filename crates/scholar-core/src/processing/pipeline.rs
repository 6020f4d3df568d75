//! Extract, chunk and embed a single source.

use crate::chunking::{ChunkConfig, FixedSizeChunker};
use crate::embedding::Embedder;
use crate::error::{EmbeddingError, EngineError};
use crate::extraction::TextExtractor;
use crate::search::types::{display_name, get_current_timestamp, source_key, ChunkRecord};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument};

/// Chunks and vectors of one source, aligned by position.
#[derive(Debug, Clone)]
pub struct PreparedSource {
    pub source_path: String,
    pub source_name: String,
    pub records: Vec<ChunkRecord>,
    pub vectors: Vec<Vec<f32>>,
}

impl PreparedSource {
    pub fn chunk_count(&self) -> usize {
        self.records.len()
    }
}

/// Outcome of one [`ingest`](crate::search::RetrievalEngine::ingest) call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Files that produced at least one chunk
    pub files_indexed: usize,
    /// Files with no extractable text
    pub files_skipped: usize,
    /// Files whose extraction or embedding failed
    pub files_failed: usize,
    pub chunks_added: usize,
}

impl IngestReport {
    /// Returns true if the index changed.
    pub fn has_changes(&self) -> bool {
        self.chunks_added > 0
    }
}

/// Runs `embedder` over `texts` on the blocking pool.
///
/// # Errors
///
/// Returns `EngineError::EmbeddingUnavailable` if the model fails or returns
/// a different number of vectors than texts, and `EngineError::Worker` if
/// the blocking task panics.
pub async fn embed_blocking(
    embedder: Arc<dyn Embedder>,
    texts: Vec<String>,
) -> Result<Vec<Vec<f32>>, EngineError> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    let expected = texts.len();
    let vectors = tokio::task::spawn_blocking(move || embedder.embed_batch(&texts)).await??;

    if vectors.len() != expected {
        return Err(EmbeddingError::CountMismatch {
            expected,
            actual: vectors.len(),
        }
        .into());
    }
    Ok(vectors)
}

/// Extract → chunk → embed for one path at a time.
///
/// # Thread Safety
///
/// The pipeline is `Send + Sync`; the embedder and extractor are shared
/// through `Arc`.
pub struct IngestionPipeline {
    extractor: Arc<dyn TextExtractor>,
    embedder: Arc<dyn Embedder>,
    chunker: FixedSizeChunker,
}

impl IngestionPipeline {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        embedder: Arc<dyn Embedder>,
        chunk_config: ChunkConfig,
    ) -> Self {
        Self {
            extractor,
            embedder,
            chunker: FixedSizeChunker::new(chunk_config),
        }
    }

    pub fn embedder(&self) -> Arc<dyn Embedder> {
        Arc::clone(&self.embedder)
    }

    pub fn chunk_config(&self) -> ChunkConfig {
        self.chunker.config()
    }

    /// Prepares `path` for indexing.
    ///
    /// `source_mtime` is stamped on every record; pass it for tracked sources.
    ///
    /// # Returns
    ///
    /// `Ok(None)` if the file has no text. Extraction and embedding errors are
    /// returned so the caller can decide whether to skip the file.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub async fn prepare(
        &self,
        path: &Path,
        source_mtime: Option<u64>,
    ) -> Result<Option<PreparedSource>, EngineError> {
        let start = Instant::now();
        let text = self.extractor.extract(path).await?;
        if text.is_empty() {
            debug!("No text extracted from {}", path.display());
            return Ok(None);
        }

        let chunks = self.chunker.chunk(&text);
        if chunks.is_empty() {
            debug!("No chunks produced for {}", path.display());
            return Ok(None);
        }

        let source_path = source_key(path);
        let source_name = display_name(path);
        let indexed_at = get_current_timestamp();

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let vectors = embed_blocking(Arc::clone(&self.embedder), texts).await?;

        let records = chunks
            .into_iter()
            .map(|chunk| ChunkRecord {
                source_path: source_path.clone(),
                source_name: source_name.clone(),
                chunk_index: chunk.index,
                text: chunk.text,
                indexed_at,
                source_mtime,
            })
            .collect::<Vec<_>>();

        debug!(
            "Prepared {} chunks from {} in {}ms",
            records.len(),
            source_name,
            start.elapsed().as_millis()
        );

        Ok(Some(PreparedSource {
            source_path,
            source_name,
            records,
            vectors,
        }))
    }
}
