//! Ordered chunk records, aligned one-to-one with the vector index.

use super::types::ChunkRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered sequence of chunk records.
///
/// Position *i* describes vector ordinal *i*. The store only grows by
/// appending and only shrinks through [`MetadataStore::without_source`],
/// which the selective rebuild pairs with a full vector index rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataStore {
    records: Vec<ChunkRecord>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<ChunkRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, ordinal: usize) -> Option<&ChunkRecord> {
        self.records.get(ordinal)
    }

    pub fn records(&self) -> &[ChunkRecord] {
        &self.records
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = ChunkRecord>) {
        self.records.extend(records);
    }

    /// Returns `true` if any record came from `source_path`.
    pub fn contains_source(&self, source_path: &str) -> bool {
        self.records.iter().any(|r| r.source_path == source_path)
    }

    /// Number of records from `source_path`.
    pub fn count_for_source(&self, source_path: &str) -> usize {
        self.records
            .iter()
            .filter(|r| r.source_path == source_path)
            .count()
    }

    /// Copy of this store with every record from `source_path` removed,
    /// preserving the order of the rest.
    pub fn without_source(&self, source_path: &str) -> Self {
        Self {
            records: self
                .records
                .iter()
                .filter(|r| r.source_path != source_path)
                .cloned()
                .collect(),
        }
    }

    /// Chunk counts per source, ordered by source path.
    pub fn source_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            *counts.entry(record.source_path.as_str()).or_insert(0) += 1;
        }
        counts
    }
}
