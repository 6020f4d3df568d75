//! End-to-end tests over a real data directory and on-disk index.
//!
//! These tests exercise the full workflow:
//! 1. Initialize: load → tracked-source check → data directory scan
//! 2. Ingest: extraction → chunking → embedding → append → save
//! 3. Search: query embedding → flat L2 scan → ranked hits
//!
//! The deterministic `HashingEmbedder` stands in for the model, so no model
//! files are needed. The one test that loads MiniLM is ignored by default.
//! Run it with: `SCHOLAR_MODEL_DIR=/path/to/minilm cargo test -p scholar-core --test integration_tests -- --ignored`

use scholar_core::config::{EngineConfig, HISTORY_FILENAME, METADATA_FILENAME, VECTORS_FILENAME};
use scholar_core::embedding::{Embedder, HashingEmbedder, MiniLmConfig, MiniLmEmbedder};
use scholar_core::search::{format_context, RetrievalEngine, TrackedAction};
use scholar_core::storage::NativeStorage;
use scholar_core::{ConfigError, ConversationLog, EngineError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

const DIM: usize = 128;

// ============================================================================
// Fixtures
// ============================================================================

fn open_engine(data_dir: &Path) -> RetrievalEngine<NativeStorage> {
    let config = EngineConfig::new(data_dir).with_embedding_dim(DIM);
    RetrievalEngine::open(config, Arc::new(HashingEmbedder::new(DIM))).unwrap()
}

/// Text of exactly `len` characters built from biology sentences.
fn lecture_text(len: usize) -> String {
    "The cell membrane regulates what enters and leaves the cell. "
        .repeat(len / 20 + 1)
        .chars()
        .take(len)
        .collect()
}

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn touch_later(path: &Path, secs: u64) {
    let file = std::fs::OpenOptions::new().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(secs))
        .unwrap();
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_three_chunk_file_returns_three_hits() {
    let dir = TempDir::new().unwrap();
    // 2000 chars with chunks of 800 stepping by 700: starts 0, 700, 1400.
    write(dir.path(), "membranes.txt", &lecture_text(2000));

    let engine = open_engine(dir.path());
    let report = engine.initialize().await.unwrap();
    assert_eq!(report.ingest.chunks_added, 3);

    let hits = engine.search("cell membrane", 5).await.unwrap();
    assert_eq!(hits.len(), 3);
    assert!(hits.windows(2).all(|w| w[0].similarity >= w[1].similarity));

    let chunk_indices: Vec<usize> = {
        let mut indices: Vec<usize> = hits.iter().map(|h| h.chunk_index).collect();
        indices.sort();
        indices
    };
    assert_eq!(chunk_indices, vec![0, 1, 2]);
}

#[tokio::test]
async fn test_conversation_update_replaces_only_tracked_chunks() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "genetics.md",
        "Dominant alleles mask recessive alleles in heterozygotes.",
    );
    let log = ConversationLog::new(dir.path().join(HISTORY_FILENAME));
    log.append("What is a codon?", "Three nucleotides coding one amino acid.", "llama3")
        .await
        .unwrap();

    let engine = open_engine(dir.path());
    engine.initialize().await.unwrap();
    let before = engine.stats().await;
    let genetics_before = engine.search("dominant recessive alleles", 1).await.unwrap();

    log.append("And an anticodon?", "The tRNA triplet pairing with a codon.", "llama3")
        .await
        .unwrap();
    touch_later(log.path(), 60);

    let report = engine.initialize().await.unwrap();
    assert!(matches!(
        report.tracked[0].action,
        TrackedAction::Rebuilt { .. }
    ));
    assert_eq!(report.ingest.files_indexed, 0);

    let after = engine.stats().await;
    assert!(after.generation > before.generation);
    let history_key = log.path().to_string_lossy().into_owned();
    assert_eq!(after.sources[&history_key], 1);
    assert_eq!(after.sources.len(), before.sources.len());

    let hits = engine.search("tRNA anticodon", 1).await.unwrap();
    assert_eq!(hits[0].source_name, HISTORY_FILENAME);
    assert!(hits[0].chunk_text.contains("tRNA triplet"));
    assert!(hits[0].chunk_text.contains("Three nucleotides"));

    let genetics_after = engine.search("dominant recessive alleles", 1).await.unwrap();
    assert_eq!(genetics_before[0].chunk_text, genetics_after[0].chunk_text);
}

#[tokio::test]
async fn test_index_survives_restart() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "membranes.txt", &lecture_text(2000));
    write(dir.path(), HISTORY_FILENAME, "User asked about osmosis.");

    {
        let engine = open_engine(dir.path());
        engine.initialize().await.unwrap();
    }

    assert!(dir.path().join("index").join(VECTORS_FILENAME).exists());
    assert!(dir.path().join("index").join(METADATA_FILENAME).exists());

    let engine = open_engine(dir.path());
    let load = engine.load().await;
    assert_eq!(load.restored_chunks, 4);
    assert!(load.discarded.is_none());

    let hits = engine.search("cell membrane", 10).await.unwrap();
    assert_eq!(hits.len(), 4);

    // Nothing changed on disk, so a restart does not re-index anything.
    let report = engine.initialize().await.unwrap();
    assert!(!report.has_changes());
    assert_eq!(report.tracked[0].action, TrackedAction::Unchanged);
}

#[tokio::test]
async fn test_equivalent_data_dir_spelling_reuses_index() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "membranes.txt", &lecture_text(2000));
    write(dir.path(), HISTORY_FILENAME, "User asked about osmosis.");

    {
        let engine = open_engine(dir.path());
        engine.initialize().await.unwrap();
    }

    let engine = open_engine(&dir.path().join("."));
    let report = engine.initialize().await.unwrap();

    assert_eq!(report.load.restored_chunks, 4);
    assert_eq!(report.ingest.files_indexed, 0);
    assert_eq!(report.tracked[0].action, TrackedAction::Unchanged);
    assert_eq!(engine.stats().await.source_count, 2);
}

#[tokio::test]
async fn test_corrupt_index_falls_back_to_empty_and_rescans() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "membranes.txt", &lecture_text(2000));

    {
        let engine = open_engine(dir.path());
        engine.initialize().await.unwrap();
    }
    std::fs::write(
        dir.path().join("index").join(VECTORS_FILENAME),
        b"truncated",
    )
    .unwrap();

    let engine = open_engine(dir.path());
    let report = engine.initialize().await.unwrap();

    assert_eq!(report.load.restored_chunks, 0);
    assert!(report.load.discarded.is_some());
    assert_eq!(report.ingest.chunks_added, 3);
    assert_eq!(engine.stats().await.chunk_count, 3);
}

#[tokio::test]
async fn test_missing_metadata_artifact_is_corrupt() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "notes.txt", "Ribosomes translate messenger RNA.");

    {
        let engine = open_engine(dir.path());
        engine.initialize().await.unwrap();
    }
    std::fs::remove_file(dir.path().join("index").join(METADATA_FILENAME)).unwrap();

    let engine = open_engine(dir.path());
    let load = engine.load().await;
    assert_eq!(load.restored_chunks, 0);
    assert!(load.discarded.unwrap().contains(METADATA_FILENAME));
}

#[tokio::test]
async fn test_zero_dimension_vectors_header_is_discarded() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "notes.txt", "Ribosomes translate messenger RNA.");

    let generation = {
        let engine = open_engine(dir.path());
        engine.initialize().await.unwrap();
        engine.stats().await.generation
    };

    let mut header = b"SCHVIDX1".to_vec();
    header.extend_from_slice(&0u32.to_le_bytes());
    header.extend_from_slice(&(u64::MAX / 2).to_le_bytes());
    header.extend_from_slice(&generation.to_le_bytes());
    std::fs::write(dir.path().join("index").join(VECTORS_FILENAME), header).unwrap();

    let engine = open_engine(dir.path());
    let load = engine.load().await;
    assert_eq!(load.restored_chunks, 0);
    assert!(load.discarded.unwrap().contains(VECTORS_FILENAME));
}

#[tokio::test]
async fn test_empty_index_search_is_empty() {
    let dir = TempDir::new().unwrap();
    let engine = open_engine(dir.path());
    engine.initialize().await.unwrap();

    let hits = engine.search("anything at all", 3).await.unwrap();
    assert!(hits.is_empty());
    assert_eq!(format_context(&hits), "");
}

#[tokio::test]
async fn test_zero_k_is_invalid_query() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "notes.txt", "Ribosomes translate messenger RNA.");

    let engine = open_engine(dir.path());
    engine.initialize().await.unwrap();

    assert!(matches!(
        engine.search("ribosomes", 0).await,
        Err(EngineError::InvalidQuery(_))
    ));
}

#[test]
fn test_overlap_equal_to_chunk_size_is_config_error() {
    let dir = TempDir::new().unwrap();
    let config = EngineConfig::new(dir.path())
        .with_embedding_dim(DIM)
        .with_chunking(800, 800);

    let result = RetrievalEngine::open(config, Arc::new(HashingEmbedder::new(DIM)));
    assert!(matches!(
        result,
        Err(EngineError::Configuration(ConfigError::Chunking(_)))
    ));
    // Validation happens before anything touches the disk.
    assert!(!dir.path().join("index").exists());
}

#[tokio::test]
async fn test_inline_note_then_context_block() {
    let dir = TempDir::new().unwrap();
    let engine = open_engine(dir.path());

    engine
        .index_inline_text(
            "Exam tips",
            "Review the Krebs cycle intermediates before Friday.",
            "note-42",
        )
        .await
        .unwrap();

    let hits = engine.search("Krebs cycle", 3).await.unwrap();
    assert_eq!(hits.len(), 1);

    let context = format_context(&hits);
    assert!(context.starts_with("Relevant context from your documents:"));
    assert!(context.contains(&format!("[Source 1: {}]", hits[0].source_name)));
    assert!(context.contains("Krebs cycle intermediates"));
}

#[tokio::test]
#[ignore = "requires MiniLM model files in SCHOLAR_MODEL_DIR"]
async fn test_minilm_end_to_end() {
    let Ok(model_dir) = std::env::var("SCHOLAR_MODEL_DIR") else {
        return;
    };
    let embedder = MiniLmEmbedder::from_dir(Path::new(&model_dir), MiniLmConfig::default())
        .expect("Failed to load MiniLM - check SCHOLAR_MODEL_DIR");
    assert_eq!(embedder.embedding_dim(), 384);

    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "biology.txt",
        "Photosynthesis converts light energy into chemical energy in chloroplasts.",
    );
    write(
        dir.path(),
        "history.md",
        "The Treaty of Westphalia ended the Thirty Years' War in 1648.",
    );

    let engine = RetrievalEngine::open(EngineConfig::new(dir.path()), Arc::new(embedder)).unwrap();
    engine.initialize().await.unwrap();

    let hits = engine.search("How do plants make energy from sunlight?", 2).await.unwrap();
    assert_eq!(hits[0].source_name, "biology.txt");
}
