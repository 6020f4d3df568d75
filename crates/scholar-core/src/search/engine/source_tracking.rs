//! Change detection for tracked mutable sources.
//!
//! A tracked source (by default the conversation log) is indexed like any
//! other file, but its modification time is stored alongside the index.
//! When the file's mtime moves forward, its chunks are replaced through a
//! filtered rebuild (see `rebuild.rs`). Write-once sources are never
//! re-checked.

use super::RetrievalEngine;
use crate::error::{EmbeddingError, EngineError};
use crate::search::types::{source_key, system_time_to_nanos};
use crate::storage::StorageBackend;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info, warn};

/// Where a tracked source stands relative to the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    /// The file does not exist
    Missing,
    /// The file exists but has never been indexed
    New { mtime: u64 },
    /// The stored mtime is not older than the file's
    Unchanged,
    /// The file changed since it was indexed
    Modified { mtime: u64 },
}

impl SourceStatus {
    /// Compares a stored mtime with the file's current one.
    pub fn classify(stored: Option<u64>, current: Option<u64>) -> Self {
        match (stored, current) {
            (_, None) => SourceStatus::Missing,
            (None, Some(mtime)) => SourceStatus::New { mtime },
            (Some(stored), Some(mtime)) if mtime > stored => SourceStatus::Modified { mtime },
            (Some(_), Some(_)) => SourceStatus::Unchanged,
        }
    }
}

/// What [`initialize`](RetrievalEngine::initialize) did with one tracked source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TrackedAction {
    Missing,
    Unchanged,
    /// First indexing
    Indexed { chunks: usize },
    /// Old chunks replaced by a filtered rebuild
    Rebuilt { removed: usize, added: usize },
    /// Left as it was; retried on the next call
    Failed { reason: String },
}

impl TrackedAction {
    pub fn is_change(&self) -> bool {
        matches!(self, TrackedAction::Indexed { .. } | TrackedAction::Rebuilt { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackedUpdate {
    pub source_path: String,
    #[serde(flatten)]
    pub action: TrackedAction,
}

/// Modification time of `path` in nanoseconds, or `None` if it does not exist.
pub(super) async fn current_mtime(path: &Path) -> std::io::Result<Option<u64>> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) => Ok(Some(system_time_to_nanos(metadata.modified()?))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

impl<S: StorageBackend> RetrievalEngine<S> {
    /// Status of a tracked source against the loaded index.
    pub async fn source_status(&self, path: &Path) -> Result<SourceStatus, EngineError> {
        let current = current_mtime(path).await?;
        let stored = self.state.read().await.source_mtime(&source_key(path));
        Ok(SourceStatus::classify(stored, current))
    }

    /// Checks every tracked source and brings changed ones up to date.
    /// Callers hold the writer lock and persist afterwards.
    pub(super) async fn refresh_tracked_sources(&self) -> Result<Vec<TrackedUpdate>, EngineError> {
        let mut updates = Vec::with_capacity(self.config.tracked_sources.len());

        for path in &self.config.tracked_sources {
            let action = match self.refresh_tracked_source(path).await {
                Ok(action) => action,
                Err(EngineError::EmbeddingUnavailable(EmbeddingError::ModelUnavailable(reason))) => {
                    return Err(EmbeddingError::ModelUnavailable(reason).into());
                }
                Err(e) => {
                    warn!("Tracked source {} not updated: {}", path.display(), e);
                    TrackedAction::Failed {
                        reason: e.to_string(),
                    }
                }
            };
            updates.push(TrackedUpdate {
                source_path: source_key(path),
                action,
            });
        }
        Ok(updates)
    }

    async fn refresh_tracked_source(&self, path: &Path) -> Result<TrackedAction, EngineError> {
        let key = source_key(path);
        let (mtime, has_chunks) = match self.source_status(path).await? {
            SourceStatus::Missing => {
                debug!("Tracked source {} does not exist", path.display());
                return Ok(TrackedAction::Missing);
            }
            SourceStatus::Unchanged => {
                debug!("Tracked source {} unchanged", path.display());
                return Ok(TrackedAction::Unchanged);
            }
            SourceStatus::New { mtime } | SourceStatus::Modified { mtime } => {
                let state = self.state.read().await;
                (mtime, state.metadata().contains_source(&key))
            }
        };

        if has_chunks {
            let (removed, added) = self.rebuild_source(path, mtime).await?;
            Ok(TrackedAction::Rebuilt { removed, added })
        } else {
            let chunks = self.index_tracked_source(path, mtime).await?;
            Ok(TrackedAction::Indexed { chunks })
        }
    }

    /// Appends a tracked source that has no chunks in the index yet.
    async fn index_tracked_source(&self, path: &Path, mtime: u64) -> Result<usize, EngineError> {
        let key = source_key(path);
        let prepared = self.pipeline.prepare(path, Some(mtime)).await?;

        let mut state = self.state.write().await;
        let chunks = match prepared {
            Some(source) => {
                let count = source.chunk_count();
                state.append(source.vectors, source.records)?;
                count
            }
            None => 0,
        };
        state.record_source_version(&key, mtime);
        state.bump_generation();

        info!("Indexed tracked source {} ({} chunks)", key, chunks);
        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(SourceStatus::classify(None, None), SourceStatus::Missing);
        assert_eq!(SourceStatus::classify(Some(5), None), SourceStatus::Missing);
        assert_eq!(
            SourceStatus::classify(None, Some(5)),
            SourceStatus::New { mtime: 5 }
        );
        assert_eq!(SourceStatus::classify(Some(5), Some(5)), SourceStatus::Unchanged);
        assert_eq!(
            SourceStatus::classify(Some(5), Some(9)),
            SourceStatus::Modified { mtime: 9 }
        );
    }

    #[test]
    fn test_older_mtime_is_unchanged() {
        assert_eq!(SourceStatus::classify(Some(9), Some(5)), SourceStatus::Unchanged);
    }

    #[test]
    fn test_only_index_changes_count() {
        assert!(TrackedAction::Indexed { chunks: 0 }.is_change());
        assert!(TrackedAction::Rebuilt { removed: 1, added: 1 }.is_change());
        assert!(!TrackedAction::Unchanged.is_change());
        assert!(!TrackedAction::Missing.is_change());
        assert!(!TrackedAction::Failed {
            reason: "timeout".to_string()
        }
        .is_change());
    }

    #[test]
    fn test_update_serializes_flat() {
        let update = TrackedUpdate {
            source_path: "/data/history.txt".to_string(),
            action: TrackedAction::Rebuilt { removed: 2, added: 3 },
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["action"], "rebuilt");
        assert_eq!(json["removed"], 2);
        assert_eq!(json["source_path"], "/data/history.txt");
    }
}
