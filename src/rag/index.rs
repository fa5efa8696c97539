//! Exact nearest-neighbour index over chunk embeddings.
//!
//! Vectors live in one row-major `ndarray` matrix; row *i* belongs to the
//! chunk at position *i* of the corpus store. Distances are squared L2.

use std::cmp::Ordering;

use ndarray::{Array2, ArrayView1};

use crate::core::errors::RagError;
use crate::embedding::Embedding;

const MAGIC: &[u8; 8] = b"RAGIDX01";
const HEADER_LEN: usize = 8 + 4 + 8;

/// One search hit: index position plus its distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub position: usize,
    pub distance: f32,
}

#[derive(Debug, Clone)]
pub struct FlatIndex {
    vectors: Array2<f32>,
}

impl FlatIndex {
    /// An empty index of the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            vectors: Array2::zeros((0, dimension)),
        }
    }

    /// Builds an index whose row order matches `vectors`.
    pub fn build(vectors: &[Embedding]) -> Result<Self, RagError> {
        let Some(first) = vectors.first() else {
            return Err(RagError::InvalidInput(
                "Cannot build an index from zero vectors".to_string(),
            ));
        };
        let dimension = first.len();
        if dimension == 0 {
            return Err(RagError::InvalidInput(
                "Embedding vectors must not be empty".to_string(),
            ));
        }

        let mut flat = Vec::with_capacity(vectors.len() * dimension);
        for (position, vector) in vectors.iter().enumerate() {
            if vector.len() != dimension {
                return Err(RagError::InvalidInput(format!(
                    "Vector {} has dimension {}, expected {}",
                    position,
                    vector.len(),
                    dimension
                )));
            }
            flat.extend_from_slice(vector);
        }

        let vectors = Array2::from_shape_vec((vectors.len(), dimension), flat)
            .map_err(|e| RagError::InvalidInput(e.to_string()))?;
        Ok(Self { vectors })
    }

    pub fn len(&self) -> usize {
        self.vectors.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dimension(&self) -> usize {
        self.vectors.ncols()
    }

    pub fn vector(&self, position: usize) -> Option<Vec<f32>> {
        (position < self.len()).then(|| self.vectors.row(position).to_vec())
    }

    /// Returns the `min(k, len)` nearest rows, nearest first.
    ///
    /// Equal distances keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, RagError> {
        if query.len() != self.dimension() {
            return Err(RagError::InvalidInput(format!(
                "Query dimension mismatch: {} != {}",
                query.len(),
                self.dimension()
            )));
        }
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let query = ArrayView1::from(query);
        let mut neighbors: Vec<Neighbor> = self
            .vectors
            .rows()
            .into_iter()
            .enumerate()
            .map(|(position, row)| Neighbor {
                position,
                distance: squared_l2(row, query),
            })
            .collect();

        neighbors.sort_by(|left, right| {
            left.distance
                .partial_cmp(&right.distance)
                .unwrap_or(Ordering::Equal)
                .then(left.position.cmp(&right.position))
        });
        neighbors.truncate(k);
        Ok(neighbors)
    }

    /// Serializes as `RAGIDX01`, u32 dimension, u64 count, then f32 rows, all little endian.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.vectors.len() * 4);
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&(self.dimension() as u32).to_le_bytes());
        bytes.extend_from_slice(&(self.len() as u64).to_le_bytes());
        bytes.extend(self.vectors.iter().flat_map(|f| f.to_le_bytes()));
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RagError> {
        if bytes.len() < HEADER_LEN || &bytes[..8] != MAGIC {
            return Err(RagError::index("vector file has no valid header"));
        }

        let dimension = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
        let mut count_bytes = [0u8; 8];
        count_bytes.copy_from_slice(&bytes[12..20]);
        let count = u64::from_le_bytes(count_bytes) as usize;

        let payload = &bytes[HEADER_LEN..];
        let expected = count
            .checked_mul(dimension)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| RagError::index("vector file header overflows"))?;
        if payload.len() != expected {
            return Err(RagError::index(format!(
                "vector file holds {} bytes, header promises {}",
                payload.len(),
                expected
            )));
        }

        let flat: Vec<f32> = payload
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        let vectors = Array2::from_shape_vec((count, dimension), flat).map_err(RagError::index)?;
        Ok(Self { vectors })
    }
}

fn squared_l2(row: ArrayView1<f32>, query: ArrayView1<f32>) -> f32 {
    row.iter()
        .zip(query.iter())
        .map(|(a, b)| {
            let diff = a - b;
            diff * diff
        })
        .sum()
}
