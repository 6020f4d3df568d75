// Exact (flat) L2 vector index with append and full rebuild

use super::types::{validate_dimension, IndexError};
use space::{Metric, Neighbor};
use tracing::instrument;

const MAGIC: &[u8; 8] = b"SCHVIDX1";
/// magic + dimension (u32) + count (u64) + generation (u64)
const HEADER_LEN: usize = 8 + 4 + 8 + 8;

/// Euclidean distance metric for embedding vectors.
///
/// Distances are non-negative, and the IEEE-754 bit patterns of non-negative
/// floats order the same way as the floats themselves, so `f32::to_bits`
/// gives an integer unit without scaling.
struct EuclideanDistance;

impl Metric<Box<[f32]>> for EuclideanDistance {
    type Unit = u32;

    fn distance(&self, a: &Box<[f32]>, b: &Box<[f32]>) -> u32 {
        let a_slice: &[f32] = a;
        let b_slice: &[f32] = b;

        let squared: f32 = a_slice
            .iter()
            .zip(b_slice.iter())
            .map(|(&x, &y)| (x - y) * (x - y))
            .sum();

        squared.sqrt().to_bits()
    }
}

/// Append-only exact nearest-neighbor index.
///
/// Vectors are addressed by ordinal (insertion position). There is no point
/// deletion: removing entries means rebuilding from the survivors.
///
/// Search is a linear scan, so results are exact and ties between equal
/// distances resolve to the lower ordinal.
pub struct FlatL2Index {
    vectors: Vec<Box<[f32]>>,
    dimension: usize,
}

impl FlatL2Index {
    /// Create an empty index for vectors of `dimension` components.
    pub fn new(dimension: usize) -> Self {
        Self {
            vectors: Vec::new(),
            dimension,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Stored vectors in ordinal order.
    pub fn vectors(&self) -> impl ExactSizeIterator<Item = &[f32]> + '_ {
        self.vectors.iter().map(|v| &**v)
    }

    /// Appends `vectors` in order, returning the ordinal of the first one.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::DimensionMismatch` if any vector has the wrong
    /// dimension; in that case nothing is appended.
    #[instrument(skip_all, fields(index_size = self.vectors.len(), adding = vectors.len()))]
    pub fn add(&mut self, vectors: Vec<Vec<f32>>) -> Result<usize, IndexError> {
        for vector in &vectors {
            validate_dimension(self.dimension, vector.len())?;
        }

        let first = self.vectors.len();
        self.vectors
            .extend(vectors.into_iter().map(Vec::into_boxed_slice));
        Ok(first)
    }

    /// Replaces the entire contents with `vectors`.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::DimensionMismatch` without modifying the index if
    /// any vector has the wrong dimension.
    pub fn rebuild(&mut self, vectors: Vec<Vec<f32>>) -> Result<(), IndexError> {
        for vector in &vectors {
            validate_dimension(self.dimension, vector.len())?;
        }

        self.vectors = vectors.into_iter().map(Vec::into_boxed_slice).collect();
        Ok(())
    }

    /// Search for the `k` nearest vectors by Euclidean distance.
    ///
    /// # Returns
    /// Up to `min(k, len)` `(ordinal, distance)` pairs, nearest first.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::DimensionMismatch` if the query dimension doesn't
    /// match the index.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>, IndexError> {
        validate_dimension(self.dimension, query.len())?;

        if self.vectors.is_empty() || k == 0 {
            return Ok(vec![]);
        }

        let actual_k = std::cmp::min(k, self.vectors.len());
        let query_box: Box<[f32]> = query.into();

        let mut neighbors: Vec<Neighbor<u32>> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(index, vector)| Neighbor {
                index,
                distance: EuclideanDistance.distance(&query_box, vector),
            })
            .collect();

        // Stable sort keeps lower ordinals first among equal distances.
        neighbors.sort_by_key(|n| n.distance);
        neighbors.truncate(actual_k);

        Ok(neighbors
            .into_iter()
            .map(|n| (n.index, f32::from_bits(n.distance)))
            .collect())
    }

    /// Serializes to the binary artifact format: a fixed header followed by
    /// little-endian f32 components in ordinal order.
    pub fn to_bytes(&self, generation: u64) -> Vec<u8> {
        let mut buffer =
            Vec::with_capacity(HEADER_LEN + self.vectors.len() * self.dimension * 4);
        buffer.extend_from_slice(MAGIC);
        buffer.extend_from_slice(&(self.dimension as u32).to_le_bytes());
        buffer.extend_from_slice(&(self.vectors.len() as u64).to_le_bytes());
        buffer.extend_from_slice(&generation.to_le_bytes());

        for vector in &self.vectors {
            for &value in vector.iter() {
                buffer.extend_from_slice(&value.to_le_bytes());
            }
        }

        buffer
    }

    /// Parses the binary artifact format, returning the index and its generation.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::InvalidData` for a bad header or a body whose size
    /// disagrees with the header.
    pub fn from_bytes(data: &[u8]) -> Result<(Self, u64), IndexError> {
        if data.len() < HEADER_LEN {
            return Err(IndexError::InvalidData(format!(
                "{} bytes is shorter than the {}-byte header",
                data.len(),
                HEADER_LEN
            )));
        }
        if &data[..8] != MAGIC {
            return Err(IndexError::InvalidData("bad magic".to_string()));
        }

        let dimension = u32::from_le_bytes(read_array(data, 8)?) as usize;
        let count = u64::from_le_bytes(read_array(data, 12)?) as usize;
        let generation = u64::from_le_bytes(read_array(data, 20)?);

        // A zero dimension would let any count pass the size check below.
        if dimension == 0 {
            return Err(IndexError::InvalidData("dimension is 0".to_string()));
        }

        let body = &data[HEADER_LEN..];
        let float_size = std::mem::size_of::<f32>();
        let expected = count
            .checked_mul(dimension)
            .and_then(|n| n.checked_mul(float_size))
            .ok_or_else(|| IndexError::InvalidData("header sizes overflow".to_string()))?;

        if body.len() != expected {
            return Err(IndexError::InvalidData(format!(
                "body is {} bytes, header declares {} vectors of dimension {}",
                body.len(),
                count,
                dimension
            )));
        }

        let vectors = body
            .chunks_exact(dimension * float_size)
            .map(|row| {
                row.chunks_exact(float_size)
                    .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                    .collect::<Box<[f32]>>()
            })
            .collect();

        Ok((Self { vectors, dimension }, generation))
    }
}

fn read_array<const N: usize>(data: &[u8], offset: usize) -> Result<[u8; N], IndexError> {
    data.get(offset..offset + N)
        .and_then(|slice| slice.try_into().ok())
        .ok_or_else(|| IndexError::InvalidData("truncated header".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_search() {
        let mut index = FlatL2Index::new(3);

        index
            .add(vec![
                vec![1.0, 0.0, 0.0],
                vec![0.0, 1.0, 0.0],
                vec![1.0, 0.1, 0.0],
            ])
            .unwrap();

        let results = index.search(&[1.0, 0.0, 0.0], 2).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, 0); // Exact match first
        assert_eq!(results[1].0, 2);
        assert_eq!(results[0].1, 0.0);
        assert!((results[1].1 - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_add_returns_first_ordinal() {
        let mut index = FlatL2Index::new(2);
        assert!(index.is_empty());

        assert_eq!(index.add(vec![vec![0.0, 0.0]]).unwrap(), 0);
        assert_eq!(index.add(vec![vec![1.0, 0.0], vec![2.0, 0.0]]).unwrap(), 1);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_search_empty_index() {
        let index = FlatL2Index::new(3);
        let results = index.search(&[1.0, 0.0, 0.0], 10).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_search_returns_min_k_len() {
        let mut index = FlatL2Index::new(3);
        index
            .add((0..20).map(|i| vec![i as f32, 0.0, 0.0]).collect())
            .unwrap();

        assert_eq!(index.search(&[10.0, 0.0, 0.0], 5).unwrap().len(), 5);
        assert_eq!(index.search(&[10.0, 0.0, 0.0], 50).unwrap().len(), 20);
    }

    #[test]
    fn test_results_sorted_ascending() {
        let mut index = FlatL2Index::new(3);
        index
            .add(
                (0..100)
                    .map(|i| {
                        let angle = (i as f32) * 0.05;
                        vec![angle.cos(), angle.sin(), 0.0]
                    })
                    .collect(),
            )
            .unwrap();

        let results = index.search(&[0.5, 0.5, 0.0], 10).unwrap();
        assert_eq!(results.len(), 10);
        for pair in results.windows(2) {
            assert!(pair[0].1 <= pair[1].1);
        }
    }

    #[test]
    fn test_ties_prefer_lower_ordinal() {
        let mut index = FlatL2Index::new(2);
        index
            .add(vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![-1.0, 0.0]])
            .unwrap();

        let results = index.search(&[0.0, 0.0], 3).unwrap();
        let ordinals: Vec<usize> = results.iter().map(|(i, _)| *i).collect();
        assert_eq!(ordinals, vec![0, 1, 2]);
    }

    #[test]
    fn test_add_dimension_mismatch_is_all_or_nothing() {
        let mut index = FlatL2Index::new(3);

        let result = index.add(vec![vec![1.0, 0.0, 0.0], vec![1.0, 0.0]]);
        assert!(matches!(
            result,
            Err(IndexError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
        assert!(index.is_empty());
    }

    #[test]
    fn test_search_dimension_mismatch() {
        let mut index = FlatL2Index::new(3);
        index.add(vec![vec![1.0, 0.0, 0.0]]).unwrap();

        let result = index.search(&[1.0, 0.0], 1);
        assert!(matches!(
            result,
            Err(IndexError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_rebuild_replaces_contents() {
        let mut index = FlatL2Index::new(2);
        index
            .add(vec![vec![1.0, 1.0], vec![2.0, 2.0], vec![3.0, 3.0]])
            .unwrap();

        index.rebuild(vec![vec![3.0, 3.0]]).unwrap();

        assert_eq!(index.len(), 1);
        let results = index.search(&[1.0, 1.0], 5).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, 0);
    }

    #[test]
    fn test_rebuild_rejects_bad_dimension_without_change() {
        let mut index = FlatL2Index::new(2);
        index.add(vec![vec![1.0, 1.0]]).unwrap();

        assert!(index.rebuild(vec![vec![1.0]]).is_err());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_binary_round_trip_preserves_order() {
        let mut index = FlatL2Index::new(3);
        index
            .add(vec![vec![0.5, -1.0, 2.25], vec![3.0, 4.0, 5.0]])
            .unwrap();

        let bytes = index.to_bytes(7);
        assert_eq!(bytes.len(), HEADER_LEN + 2 * 3 * 4);

        let (restored, generation) = FlatL2Index::from_bytes(&bytes).unwrap();
        assert_eq!(generation, 7);
        assert_eq!(restored.dimension(), 3);
        let vectors: Vec<&[f32]> = restored.vectors().collect();
        assert_eq!(vectors, vec![&[0.5, -1.0, 2.25][..], &[3.0, 4.0, 5.0][..]]);
    }

    #[test]
    fn test_from_bytes_rejects_truncated_body() {
        let mut index = FlatL2Index::new(2);
        index.add(vec![vec![1.0, 2.0]]).unwrap();
        let mut bytes = index.to_bytes(1);
        bytes.pop();

        assert!(matches!(
            FlatL2Index::from_bytes(&bytes),
            Err(IndexError::InvalidData(_))
        ));
    }

    #[test]
    fn test_from_bytes_rejects_bad_magic() {
        let mut bytes = FlatL2Index::new(2).to_bytes(0);
        bytes[0] = b'X';
        assert!(FlatL2Index::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_from_bytes_rejects_zero_dimension_with_huge_count() {
        let mut bytes = Vec::with_capacity(HEADER_LEN);
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&(u64::MAX / 2).to_le_bytes());
        bytes.extend_from_slice(&3u64.to_le_bytes());

        assert!(matches!(
            FlatL2Index::from_bytes(&bytes),
            Err(IndexError::InvalidData(_))
        ));
    }
}
