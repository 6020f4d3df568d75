//! Retrieval engine: the public face of the index.
//!
//! [`RetrievalEngine`] owns the in-memory [`IndexState`], the ingestion
//! pipeline and the persistence layer. It is constructed once and shared
//! through `Arc`; every operation takes `&self`.
//!
//! # Concurrency
//!
//! - Searches take the state's read guard only for the index scan.
//! - Mutations (ingest, inline notes, tracked-source refresh) are serialized
//!   by a writer mutex, so at most one is in flight and persistence order
//!   matches mutation order. Writers take the state's write guard only to
//!   append or swap.
//! - Embedding and index rebuilds run on the blocking pool.
//!
//! # Lifecycle
//!
//! The persisted index is loaded lazily by the first mutating call
//! (or explicitly with [`load`](RetrievalEngine::load)). A corrupt or
//! incompatible index is reported with a warning and replaced by an empty one.

mod ingest;
mod rebuild;
mod source_tracking;


pub use source_tracking::{SourceStatus, TrackedAction, TrackedUpdate};

use super::state::IndexState;
use super::types::{SearchHit, SourceVersion};
use crate::config::EngineConfig;
use crate::embedding::Embedder;
use crate::error::{ConfigError, EngineError};
use crate::extraction::{FileExtractor, TextExtractor};
use crate::history::ConversationLog;
use crate::processing::{embed_blocking, IngestReport, IngestionPipeline};
use crate::storage::{IndexStore, LoadOutcome, NativeStorage, StorageBackend};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, instrument, warn};

/// State owned by whoever holds the writer lock.
struct WriterState {
    loaded: bool,
}

/// What happened when the persisted index was read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    /// Chunks restored from disk; 0 when the index was already loaded
    pub restored_chunks: usize,
    /// Why a persisted index was discarded, if it was
    pub discarded: Option<String>,
}

/// Outcome of [`RetrievalEngine::initialize`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct InitReport {
    pub load: LoadSummary,
    /// One entry per configured tracked source
    pub tracked: Vec<TrackedUpdate>,
    /// New files found in the data directory
    pub ingest: IngestReport,
}

impl InitReport {
    /// Returns true if the index changed.
    pub fn has_changes(&self) -> bool {
        self.ingest.has_changes() || self.tracked.iter().any(|t| t.action.is_change())
    }
}

/// Snapshot of index contents.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub chunk_count: usize,
    pub source_count: usize,
    pub generation: u64,
    pub embedding_dim: usize,
    pub model_id: String,
    /// Chunk count per source path
    pub sources: BTreeMap<String, usize>,
    pub tracked_sources: Vec<SourceVersion>,
}

/// Semantic retrieval over a directory of documents and a conversation log.
pub struct RetrievalEngine<S: StorageBackend> {
    config: EngineConfig,
    pipeline: IngestionPipeline,
    store: IndexStore<S>,
    state: RwLock<IndexState>,
    writer: Mutex<WriterState>,
}

impl RetrievalEngine<NativeStorage> {
    /// Engine persisting to `config.index_dir` and reading files with
    /// [`FileExtractor`].
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Configuration` for invalid settings and
    /// `EngineError::Storage` if the index directory cannot be created.
    pub fn open(config: EngineConfig, embedder: Arc<dyn Embedder>) -> Result<Self, EngineError> {
        config.validate()?;
        let storage = NativeStorage::with_path(config.index_dir.clone())?;
        Self::new(config, embedder, Arc::new(FileExtractor::new()), storage)
    }
}

impl<S: StorageBackend> RetrievalEngine<S> {
    /// Creates an engine with an empty in-memory index.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Configuration` if the configuration is invalid or
    /// the embedder's dimension disagrees with `config.embedding_dim`.
    pub fn new(
        config: EngineConfig,
        embedder: Arc<dyn Embedder>,
        extractor: Arc<dyn TextExtractor>,
        storage: S,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        if embedder.embedding_dim() != config.embedding_dim {
            return Err(ConfigError::DimensionDisagreement {
                configured: config.embedding_dim,
                embedder: embedder.embedding_dim(),
            }
            .into());
        }

        let chunk_config = config.chunk_config()?;
        info!(
            "Retrieval engine using {} ({} dims), chunks of {} chars with {} overlap",
            embedder.model_id(),
            config.embedding_dim,
            chunk_config.chunk_size(),
            chunk_config.overlap()
        );

        Ok(Self {
            state: RwLock::new(IndexState::empty(config.embedding_dim)),
            store: IndexStore::new(storage, embedder.model_id()),
            pipeline: IngestionPipeline::new(extractor, embedder, chunk_config),
            writer: Mutex::new(WriterState { loaded: false }),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn storage(&self) -> &S {
        self.store.storage()
    }

    /// Writer for the first tracked source.
    pub fn conversation_log(&self) -> ConversationLog {
        ConversationLog::new(self.config.history_path())
    }

    /// Loads the persisted index if this engine has not done so yet.
    pub async fn load(&self) -> LoadSummary {
        let mut writer = self.writer.lock().await;
        self.ensure_loaded(&mut writer).await
    }

    /// Brings the index up to date with the data directory.
    ///
    /// Loads the persisted index on the first call, re-indexes tracked
    /// sources whose modification time moved forward, then indexes supported
    /// files in `data_dir` that are not indexed yet. Calling it again with
    /// no file changes does nothing.
    ///
    /// # Errors
    ///
    /// Fails if the embedding model is unavailable or the index cannot be
    /// saved. Per-file problems are reported in the [`InitReport`] instead.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<InitReport, EngineError> {
        let mut writer = self.writer.lock().await;
        let load = self.ensure_loaded(&mut writer).await;
        let generation = self.state.read().await.generation();

        let mut report = InitReport {
            load,
            ..Default::default()
        };
        let outcome = self.refresh_and_scan(&mut report).await;

        // Whatever succeeded before a failure is still persisted.
        if self.state.read().await.generation() != generation {
            self.persist().await?;
        }
        outcome?;

        info!(
            "Initialized: {} tracked sources checked, {} new files indexed, {} chunks added",
            report.tracked.len(),
            report.ingest.files_indexed,
            report.ingest.chunks_added
        );
        Ok(report)
    }

    async fn refresh_and_scan(&self, report: &mut InitReport) -> Result<(), EngineError> {
        report.tracked = self.refresh_tracked_sources().await?;
        let new_files = self.scan_new_files().await?;
        report.ingest = self.ingest_locked(&new_files).await?;
        Ok(())
    }

    /// Up to `k` chunks nearest to `query`, most similar first.
    ///
    /// An empty index returns no hits without running the embedder.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidQuery` if `k` is 0 or `query` is blank.
    #[instrument(skip(self, query), fields(query_len = query.len()))]
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, EngineError> {
        if k == 0 {
            return Err(EngineError::InvalidQuery(
                "result count must be at least 1".to_string(),
            ));
        }
        let query = query.trim();
        if query.is_empty() {
            return Err(EngineError::InvalidQuery("query is empty".to_string()));
        }

        if self.state.read().await.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = embed_blocking(self.pipeline.embedder(), vec![query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::Worker("embedder returned no vector".to_string()))?;

        let state = self.state.read().await;
        let hits = state.search(&query_embedding, k)?;
        Ok(hits)
    }

    /// Current index contents.
    pub async fn stats(&self) -> IndexStats {
        let state = self.state.read().await;
        let sources: BTreeMap<String, usize> = state
            .metadata()
            .source_counts()
            .into_iter()
            .map(|(source, count)| (source.to_string(), count))
            .collect();

        IndexStats {
            chunk_count: state.len(),
            source_count: sources.len(),
            generation: state.generation(),
            embedding_dim: state.dimension(),
            model_id: self.pipeline.embedder().model_id().to_string(),
            sources,
            tracked_sources: state.tracked_sources(),
        }
    }

    async fn ensure_loaded(&self, writer: &mut WriterState) -> LoadSummary {
        if writer.loaded {
            return LoadSummary::default();
        }

        let dim = self.config.embedding_dim;
        let (state, discarded) = match self.store.load(dim).await {
            LoadOutcome::NotFound => {
                info!("No existing index found, starting empty");
                (IndexState::empty(dim), None)
            }
            LoadOutcome::Loaded(state) => (state, None),
            LoadOutcome::Incompatible { reason } => {
                warn!("Incompatible index discarded, starting empty: {}", reason);
                (IndexState::empty(dim), Some(reason))
            }
            LoadOutcome::Corrupt { reason } => {
                warn!("Corrupt index discarded, starting empty: {}", reason);
                (IndexState::empty(dim), Some(reason))
            }
        };

        let restored_chunks = state.len();
        *self.state.write().await = state;
        writer.loaded = true;

        LoadSummary {
            restored_chunks,
            discarded,
        }
    }

    /// Saves the current state. Callers hold the writer lock.
    async fn persist(&self) -> Result<(), EngineError> {
        let state = self.state.read().await;
        self.store.save(&state).await?;
        Ok(())
    }
}
