use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Returns the current Unix timestamp (seconds since UNIX_EPOCH).
///
/// If the system time is before UNIX_EPOCH (extremely unlikely),
/// returns 0 instead of panicking.
pub fn get_current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Converts a file modification time to nanoseconds since the Unix epoch.
pub fn system_time_to_nanos(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Canonical string form of a source path, used as the record key.
///
/// Relative paths are made absolute against the working directory and `.`
/// components are dropped, so `data/a.txt` and `./data/a.txt` share a key.
/// Symlinks are not resolved.
pub fn source_key(path: &Path) -> String {
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

/// Display name of a source: its file name, or the whole path if it has none.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| source_key(path))
}

/// One indexed span of text.
///
/// The record at position *i* of the metadata store describes the vector at
/// ordinal *i* of the vector index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Originating artifact (file path or materialized note path)
    pub source_path: String,
    /// Display name (file name)
    pub source_name: String,
    /// 0-based position within the source's chunk sequence
    pub chunk_index: usize,
    /// Chunk content, trimmed
    pub text: String,
    /// Unix seconds at insertion
    pub indexed_at: u64,
    /// Source modification time (ns since epoch) at embedding; tracked sources only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_mtime: Option<u64>,
}

/// Last indexed modification time of a tracked mutable source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceVersion {
    pub source_path: String,
    /// Nanoseconds since the Unix epoch
    pub mtime: u64,
}

/// A ranked retrieval result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub source_name: String,
    pub source_path: String,
    pub chunk_index: usize,
    pub chunk_text: String,
    /// Euclidean distance between query and chunk embeddings
    pub distance: f32,
    /// `1 / (1 + distance)`, in (0, 1]
    pub similarity: f32,
}

impl SearchHit {
    pub fn from_record(record: &ChunkRecord, distance: f32) -> Self {
        Self {
            source_name: record.source_name.clone(),
            source_path: record.source_path.clone(),
            chunk_index: record.chunk_index,
            chunk_text: record.text.clone(),
            distance,
            similarity: similarity_from_distance(distance),
        }
    }
}

/// Maps an L2 distance to a presentation similarity in (0, 1].
///
/// Not normalized by embedding scale: comparable within one model only.
pub fn similarity_from_distance(distance: f32) -> f32 {
    1.0 / (1.0 + distance.max(0.0))
}

/// Errors raised by the vector index.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IndexError {
    /// Embedding dimension doesn't match index dimension
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    /// Binary index data is malformed
    #[error("Invalid index data: {0}")]
    InvalidData(String),
}

/// Validates that an embedding has the expected dimension.
///
/// # Examples
///
/// ```
/// use scholar_core::search::types::validate_dimension;
///
/// assert!(validate_dimension(3, 3).is_ok());
/// assert!(validate_dimension(5, 3).is_err());
/// ```
pub fn validate_dimension(expected: usize, actual: usize) -> Result<(), IndexError> {
    if actual == expected {
        Ok(())
    } else {
        Err(IndexError::DimensionMismatch { expected, actual })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn test_similarity_range() {
        assert_eq!(similarity_from_distance(0.0), 1.0);
        assert!((similarity_from_distance(1.0) - 0.5).abs() < f32::EPSILON);
        let far = similarity_from_distance(1e6);
        assert!(far > 0.0 && far < 1e-5);
    }

    #[test]
    fn test_display_name_uses_file_name() {
        let path = PathBuf::from("/data/papers/thesis.pdf");
        assert_eq!(display_name(&path), "thesis.pdf");
        assert_eq!(source_key(&path), "/data/papers/thesis.pdf");
    }

    #[test]
    fn test_source_key_normalizes_relative_paths() {
        let cwd = std::env::current_dir().unwrap();
        let expected = cwd.join("data").join("notes.txt");

        assert_eq!(source_key(Path::new("data/notes.txt")), expected.to_string_lossy());
        assert_eq!(source_key(Path::new("./data/./notes.txt")), expected.to_string_lossy());
    }

    #[test]
    fn test_nanos_conversion() {
        let t = UNIX_EPOCH + Duration::from_nanos(1_700_000_000_123_456_789);
        assert_eq!(system_time_to_nanos(t), 1_700_000_000_123_456_789);
    }

    #[test]
    fn test_record_without_mtime_omits_field() {
        let record = ChunkRecord {
            source_path: "/a.txt".to_string(),
            source_name: "a.txt".to_string(),
            chunk_index: 0,
            text: "hello".to_string(),
            indexed_at: 1,
            source_mtime: None,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("source_mtime"));
        let back: ChunkRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
