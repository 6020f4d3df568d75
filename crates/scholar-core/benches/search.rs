//! Benchmarks for search operations.
//!
//! Run with: `cargo bench -p scholar-core --bench search`
//!
//! These benchmarks measure the performance of:
//! - Exact L2 search over the flat index at various sizes
//! - Various k values
//! - End-to-end engine search including query embedding (hashing embedder)
//!
//! # Production Configuration
//!
//! These benchmarks use constants from `scholar_core::config` to match
//! production settings. If those values change, benchmarks automatically
//! use the updated configuration.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use scholar_core::config::{EngineConfig, DEFAULT_SEARCH_K, EMBEDDING_DIM};
use scholar_core::embedding::HashingEmbedder;
use scholar_core::extraction::FileExtractor;
use scholar_core::search::{FlatL2Index, RetrievalEngine};
use scholar_core::storage::InMemoryStorage;
use std::sync::Arc;

// =============================================================================
// Benchmark Configuration
// =============================================================================

/// Seed used for generating query embeddings.
///
/// Differs from document seeds (0..N) so the query is never an exact match.
const QUERY_EMBEDDING_SEED: u64 = 1_000_000;

const INDEX_SIZES: [usize; 3] = [1_000, 10_000, 50_000];

// =============================================================================
// Test Data Generation
// =============================================================================

/// Generate a deterministic L2-normalized embedding with a seed.
fn seeded_embedding(seed: u64) -> Vec<f32> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let raw: Vec<f32> = (0..EMBEDDING_DIM)
        .map(|i| {
            let mut hasher = DefaultHasher::new();
            seed.hash(&mut hasher);
            i.hash(&mut hasher);
            let h = hasher.finish();
            ((h as f32 / u64::MAX as f32) * 2.0) - 1.0
        })
        .collect();

    // Sentence embeddings are unit length
    let norm: f32 = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
    raw.into_iter().map(|x| x / norm).collect()
}

fn build_index(size: usize) -> FlatL2Index {
    let mut index = FlatL2Index::new(EMBEDDING_DIM);
    index
        .add((0..size as u64).map(seeded_embedding).collect())
        .expect("Failed to build index");
    index
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_flat_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("flat_search");
    let query = seeded_embedding(QUERY_EMBEDDING_SEED);

    for size in INDEX_SIZES {
        let index = build_index(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &index, |b, index| {
            b.iter(|| index.search(black_box(&query), black_box(DEFAULT_SEARCH_K)))
        });
    }
    group.finish();
}

fn bench_k_values(c: &mut Criterion) {
    let mut group = c.benchmark_group("flat_search_k");
    let query = seeded_embedding(QUERY_EMBEDDING_SEED);
    let index = build_index(10_000);

    for k in [1, 3, 10, 50] {
        group.bench_with_input(BenchmarkId::from_parameter(k), &k, |b, &k| {
            b.iter(|| index.search(black_box(&query), k))
        });
    }
    group.finish();
}

fn bench_engine_search(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("Failed to create runtime");
    let dir = tempfile::TempDir::new().expect("Failed to create temp dir");

    let topics = [
        "cell membranes regulate transport of ions and nutrients",
        "mitochondria produce ATP through oxidative phosphorylation",
        "the French revolution reshaped European politics",
        "ownership and borrowing prevent data races in Rust",
        "photosynthesis converts light into chemical energy",
    ];
    for i in 0..200 {
        let text = format!("{} (lecture {})", topics[i % topics.len()], i);
        std::fs::write(dir.path().join(format!("doc_{:03}.txt", i)), text)
            .expect("Failed to write document");
    }

    let engine = RetrievalEngine::new(
        EngineConfig::new(dir.path()),
        Arc::new(HashingEmbedder::new(EMBEDDING_DIM)),
        Arc::new(FileExtractor::new()),
        InMemoryStorage::new(),
    )
    .expect("Failed to create engine");
    runtime
        .block_on(engine.initialize())
        .expect("Failed to initialize engine");

    c.bench_function("engine_search", |b| {
        b.to_async(&runtime).iter(|| async {
            engine
                .search(black_box("how do cells make energy"), DEFAULT_SEARCH_K)
                .await
        })
    });
}

criterion_group!(benches, bench_flat_search, bench_k_values, bench_engine_search);
criterion_main!(benches);
