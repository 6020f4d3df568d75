//! The vector index and its metadata, held and replaced as one unit.

use super::metadata::MetadataStore;
use super::types::{ChunkRecord, IndexError, SearchHit, SourceVersion};
use super::vector::FlatL2Index;
use std::collections::BTreeMap;

/// Vector index, aligned metadata, tracked source versions and a generation
/// counter.
///
/// The only ways to change an `IndexState` are [`IndexState::append`] and
/// building a new one with [`IndexState::from_parts`]; both keep
/// `index.len() == metadata.len()`.
pub struct IndexState {
    index: FlatL2Index,
    metadata: MetadataStore,
    sources: BTreeMap<String, u64>,
    generation: u64,
}

impl IndexState {
    pub fn empty(dimension: usize) -> Self {
        Self {
            index: FlatL2Index::new(dimension),
            metadata: MetadataStore::new(),
            sources: BTreeMap::new(),
            generation: 0,
        }
    }

    /// Assembles a state from loaded or rebuilt parts.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::InvalidData` if the index and metadata lengths differ.
    pub fn from_parts(
        index: FlatL2Index,
        metadata: MetadataStore,
        sources: BTreeMap<String, u64>,
        generation: u64,
    ) -> Result<Self, IndexError> {
        if index.len() != metadata.len() {
            return Err(IndexError::InvalidData(format!(
                "{} vectors but {} chunk records",
                index.len(),
                metadata.len()
            )));
        }
        Ok(Self {
            index,
            metadata,
            sources,
            generation,
        })
    }

    pub fn index(&self) -> &FlatL2Index {
        &self.index
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    /// Mutation counter, stamped into both persisted artifacts.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Advances the generation after a mutation.
    pub fn bump_generation(&mut self) {
        self.generation += 1;
    }

    /// Stored modification time of a tracked source.
    pub fn source_mtime(&self, source_path: &str) -> Option<u64> {
        self.sources.get(source_path).copied()
    }

    pub fn sources(&self) -> &BTreeMap<String, u64> {
        &self.sources
    }

    pub fn tracked_sources(&self) -> Vec<SourceVersion> {
        self.sources
            .iter()
            .map(|(source_path, &mtime)| SourceVersion {
                source_path: source_path.clone(),
                mtime,
            })
            .collect()
    }

    pub fn record_source_version(&mut self, source_path: &str, mtime: u64) {
        self.sources.insert(source_path.to_string(), mtime);
    }

    /// Appends vectors and their records together.
    ///
    /// # Errors
    ///
    /// Fails without changing anything if the counts differ or any vector has
    /// the wrong dimension.
    pub fn append(
        &mut self,
        vectors: Vec<Vec<f32>>,
        records: Vec<ChunkRecord>,
    ) -> Result<(), IndexError> {
        if vectors.len() != records.len() {
            return Err(IndexError::InvalidData(format!(
                "{} vectors for {} chunk records",
                vectors.len(),
                records.len()
            )));
        }
        self.index.add(vectors)?;
        self.metadata.extend(records);
        Ok(())
    }

    /// Nearest chunks to `query`, best first.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, IndexError> {
        let neighbors = self.index.search(query, k)?;

        neighbors
            .into_iter()
            .map(|(ordinal, distance)| {
                self.metadata
                    .get(ordinal)
                    .map(|record| SearchHit::from_record(record, distance))
                    .ok_or_else(|| {
                        IndexError::InvalidData(format!("no chunk record at ordinal {}", ordinal))
                    })
            })
            .collect()
    }
}
