//! Appending write-once sources: files and inline notes.

use super::RetrievalEngine;
use crate::config::is_supported_extension;
use crate::error::{EmbeddingError, EngineError};
use crate::processing::{IngestReport, PreparedSource};
use crate::search::types::source_key;
use crate::storage::StorageBackend;
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, instrument, warn};

/// Title used when a note's title is blank.
const UNTITLED_NOTE: &str = "note";

impl<S: StorageBackend> RetrievalEngine<S> {
    /// Indexes `paths` as write-once sources and persists the result.
    ///
    /// Files with no text are skipped and files that fail extraction or
    /// embedding are counted as failed; neither stops the rest of the batch.
    /// Tracked sources are left to [`initialize`](Self::initialize).
    ///
    /// # Errors
    ///
    /// Fails without changing the index if the embedding model is
    /// unavailable, and after changing it if the save fails.
    #[instrument(skip(self, paths), fields(files = paths.len()))]
    pub async fn ingest(&self, paths: &[PathBuf]) -> Result<IngestReport, EngineError> {
        let mut writer = self.writer.lock().await;
        self.ensure_loaded(&mut writer).await;

        let report = self.ingest_locked(paths).await?;
        if report.has_changes() {
            self.persist().await?;
        }
        Ok(report)
    }

    /// Writes `content` to a new file in the data directory and indexes it.
    ///
    /// The file is named `<title>_<YYYYmmdd_HHMMSS>.txt` with spaces and `/`
    /// in the title replaced by `_`; a numeric suffix is added if that name
    /// is taken. `id` identifies the note in logs.
    #[instrument(skip_all, fields(title = %title, id = %id))]
    pub async fn index_inline_text(
        &self,
        title: &str,
        content: &str,
        id: &str,
    ) -> Result<IngestReport, EngineError> {
        let mut writer = self.writer.lock().await;
        self.ensure_loaded(&mut writer).await;

        let path = self.materialize_note(title, content).await?;
        info!("Saved note {} as {}", id, path.display());

        let report = self.ingest_locked(std::slice::from_ref(&path)).await?;
        if report.has_changes() {
            self.persist().await?;
        }
        Ok(report)
    }

    /// Prepares every path, then appends all of them in one step.
    /// Callers hold the writer lock and persist afterwards.
    pub(super) async fn ingest_locked(&self, paths: &[PathBuf]) -> Result<IngestReport, EngineError> {
        let mut report = IngestReport::default();
        let mut prepared = Vec::new();

        for path in paths {
            if self.is_tracked(path) {
                debug!("Skipping tracked source {}", path.display());
                report.files_skipped += 1;
                continue;
            }

            match self.pipeline.prepare(path, None).await {
                Ok(Some(source)) => {
                    debug!("Prepared {} ({} chunks)", source.source_name, source.chunk_count());
                    report.files_indexed += 1;
                    report.chunks_added += source.chunk_count();
                    prepared.push(source);
                }
                Ok(None) => {
                    warn!("No text extracted from {}, skipping", path.display());
                    report.files_skipped += 1;
                }
                Err(EngineError::EmbeddingUnavailable(EmbeddingError::ModelUnavailable(reason))) => {
                    return Err(EmbeddingError::ModelUnavailable(reason).into());
                }
                Err(e) => {
                    warn!("Failed to index {}: {}", path.display(), e);
                    report.files_failed += 1;
                }
            }
        }

        if !prepared.is_empty() {
            self.append_prepared(prepared).await?;
            info!(
                "Indexed {} files ({} chunks)",
                report.files_indexed, report.chunks_added
            );
        }
        Ok(report)
    }

    async fn append_prepared(&self, prepared: Vec<PreparedSource>) -> Result<(), EngineError> {
        let mut vectors = Vec::new();
        let mut records = Vec::new();
        for source in prepared {
            vectors.extend(source.vectors);
            records.extend(source.records);
        }

        let mut state = self.state.write().await;
        state.append(vectors, records)?;
        state.bump_generation();
        Ok(())
    }

    /// Supported files directly inside the data directory that are neither
    /// tracked nor indexed, sorted by path.
    pub(super) async fn scan_new_files(&self) -> Result<Vec<PathBuf>, EngineError> {
        let data_dir = &self.config.data_dir;
        if !tokio::fs::try_exists(data_dir).await? {
            debug!("Data directory {} does not exist", data_dir.display());
            return Ok(Vec::new());
        }

        let mut candidates = Vec::new();
        let mut entries = tokio::fs::read_dir(data_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !is_supported_extension(&path) || self.is_tracked(&path) {
                continue;
            }
            match tokio::fs::metadata(&path).await {
                Ok(metadata) if metadata.is_file() => candidates.push(path),
                Ok(_) => {}
                Err(e) => warn!("Cannot stat {}: {}", path.display(), e),
            }
        }

        let state = self.state.read().await;
        let indexed = state.metadata().source_counts();
        let mut new_files: Vec<PathBuf> = candidates
            .into_iter()
            .filter(|path| !indexed.contains_key(source_key(path).as_str()))
            .collect();
        new_files.sort();

        debug!("Found {} new files in {}", new_files.len(), data_dir.display());
        Ok(new_files)
    }

    pub(super) fn is_tracked(&self, path: &Path) -> bool {
        let key = source_key(path);
        self.config
            .tracked_sources
            .iter()
            .any(|tracked| source_key(tracked) == key)
    }

    async fn materialize_note(&self, title: &str, content: &str) -> Result<PathBuf, EngineError> {
        tokio::fs::create_dir_all(&self.config.data_dir).await?;

        let stem = format!(
            "{}_{}",
            clean_title(title),
            Utc::now().format("%Y%m%d_%H%M%S")
        );

        let mut attempt = 0usize;
        loop {
            let file_name = if attempt == 0 {
                format!("{}.txt", stem)
            } else {
                format!("{}_{}.txt", stem, attempt)
            };
            let path = self.config.data_dir.join(file_name);

            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => {
                    write_note_or_remove(file, &path, content).await?;
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Writes `content` through `writer`, removing `path` if the write fails so
/// the next scan does not pick up a partial note.
pub(super) async fn write_note_or_remove<W: AsyncWrite + Unpin>(
    mut writer: W,
    path: &Path,
    content: &str,
) -> std::io::Result<()> {
    let written = match writer.write_all(content.as_bytes()).await {
        Ok(()) => writer.flush().await,
        Err(e) => Err(e),
    };
    if written.is_err() {
        drop(writer);
        if let Err(e) = tokio::fs::remove_file(path).await {
            warn!("Could not remove partial note {}: {}", path.display(), e);
        }
    }
    written
}

/// File-name-safe form of a note title.
pub(super) fn clean_title(title: &str) -> String {
    let cleaned = title.trim().replace([' ', '/'], "_");
    if cleaned.is_empty() {
        UNTITLED_NOTE.to_string()
    } else {
        cleaned
    }
}
