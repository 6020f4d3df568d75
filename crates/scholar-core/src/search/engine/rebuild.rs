//! Filtered rebuild of the append-only index.
//!
//! The flat index cannot delete, so replacing one source's chunks means
//! building a new index: every other record's text is re-embedded, the new
//! content of the source is appended, and the result is swapped in under a
//! single write guard. Cost is O(total chunks) per update.
//!
//! The staging step is bounded by `EngineConfig::rebuild_timeout`. If it
//! times out or fails, the live state and the stored mtime are untouched,
//! so the next refresh retries.

use super::RetrievalEngine;
use crate::error::EngineError;
use crate::processing::embed_blocking;
use crate::search::state::IndexState;
use crate::search::types::source_key;
use crate::search::vector::FlatL2Index;
use crate::storage::StorageBackend;
use std::path::Path;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// A fully built replacement state.
struct StagedRebuild {
    state: IndexState,
    removed: usize,
    added: usize,
}

impl<S: StorageBackend> RetrievalEngine<S> {
    /// Replaces the chunks of `path` with its current content.
    ///
    /// Returns `(removed, added)` chunk counts. Callers hold the writer lock
    /// and persist afterwards.
    #[instrument(skip(self), fields(source = %path.display()))]
    pub(super) async fn rebuild_source(
        &self,
        path: &Path,
        mtime: u64,
    ) -> Result<(usize, usize), EngineError> {
        let key = source_key(path);
        let limit = self.config.rebuild_timeout;
        let start = Instant::now();

        let staged = match tokio::time::timeout(limit, self.stage_rebuild(path, &key, mtime)).await {
            Ok(staged) => staged?,
            Err(_) => {
                warn!(
                    "Rebuild of {} exceeded {}s, keeping the current index",
                    key,
                    limit.as_secs()
                );
                return Err(EngineError::Timeout {
                    source_path: key,
                    seconds: limit.as_secs(),
                });
            }
        };

        let StagedRebuild {
            state,
            removed,
            added,
        } = staged;
        *self.state.write().await = state;

        info!(
            "Rebuilt index for {}: {} chunks removed, {} added in {}ms",
            key,
            removed,
            added,
            start.elapsed().as_millis()
        );
        Ok((removed, added))
    }

    /// Builds the replacement state off to the side.
    async fn stage_rebuild(
        &self,
        path: &Path,
        key: &str,
        mtime: u64,
    ) -> Result<StagedRebuild, EngineError> {
        // Only the writer mutates the state, and the caller holds the writer lock.
        let (survivors, sources, generation, removed) = {
            let state = self.state.read().await;
            (
                state.metadata().without_source(key),
                state.sources().clone(),
                state.generation(),
                state.metadata().count_for_source(key),
            )
        };

        let texts: Vec<String> = survivors
            .records()
            .iter()
            .map(|record| record.text.clone())
            .collect();
        let vectors = embed_blocking(self.pipeline.embedder(), texts).await?;

        let dimension = self.config.embedding_dim;
        let index = tokio::task::spawn_blocking(move || {
            let mut index = FlatL2Index::new(dimension);
            index.rebuild(vectors).map(|()| index)
        })
        .await??;

        let mut state = IndexState::from_parts(index, survivors, sources, generation)?;

        let added = match self.pipeline.prepare(path, Some(mtime)).await? {
            Some(source) => {
                let count = source.chunk_count();
                state.append(source.vectors, source.records)?;
                count
            }
            None => 0,
        };
        state.record_source_version(key, mtime);
        state.bump_generation();

        Ok(StagedRebuild {
            state,
            removed,
            added,
        })
    }
}
