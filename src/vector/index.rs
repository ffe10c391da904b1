//! Flat inner-product index
//!
//! Exact nearest-neighbor search over a [`VectorCorpus`] snapshot. Every
//! row is scored against the query; there is no pruning. Rows are expected
//! to be unit length, so the inner product is the cosine similarity.

use crate::store::{DocumentId, VectorCorpus};
use rayon::prelude::*;
use std::cmp::Ordering;
use thiserror::Error;
use tracing::debug;

/// Vector index errors
#[derive(Error, Debug, PartialEq)]
pub enum IndexError {
    /// A corpus row does not have the corpus dimension
    #[error("Dimension mismatch in row {row}: expected {expected}, got {got}")]
    RowDimensionMismatch { row: usize, expected: usize, got: usize },

    /// The query does not have the index dimension
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("top_k must be greater than zero")]
    InvalidTopK,
}

pub type IndexResult<T> = Result<T, IndexError>;

/// A raw search hit: row position in the index and its score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub position: usize,
    pub score: f32,
}

/// Brute-force index over one corpus snapshot.
///
/// Owns a copy of the identifier order it was built from, so positions it
/// returns can always be mapped back without a second structure.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimension: usize,
    ids: Vec<DocumentId>,
    /// Row-major, `ids.len() * dimension` values
    data: Vec<f32>,
}

impl FlatIndex {
    /// Build an index from a corpus.
    ///
    /// Returns `Ok(None)` for an empty corpus: nothing to search is not an
    /// error. Any row whose length differs from the corpus dimension fails
    /// the whole build.
    pub fn build(corpus: VectorCorpus) -> IndexResult<Option<Self>> {
        if corpus.is_empty() {
            debug!("Empty corpus, no index built");
            return Ok(None);
        }

        let dimension = corpus.dimension();
        let (ids, rows) = corpus.into_parts();

        let mut data = Vec::with_capacity(rows.len() * dimension);
        for (row, vector) in rows.iter().enumerate() {
            if vector.len() != dimension {
                return Err(IndexError::RowDimensionMismatch {
                    row,
                    expected: dimension,
                    got: vector.len(),
                });
            }
            data.extend_from_slice(vector);
        }

        debug!("Built flat index with {} rows (dimension {})", ids.len(), dimension);
        Ok(Some(Self { dimension, ids, data }))
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Identifier order the index was built with
    pub fn ids(&self) -> &[DocumentId] {
        &self.ids
    }

    /// Top `top_k` rows by inner product with `query`, best first.
    ///
    /// Equal scores are ordered by position, so output is reproducible.
    /// `top_k` larger than the index returns every row.
    pub fn search(&self, query: &[f32], top_k: usize) -> IndexResult<Vec<Neighbor>> {
        if top_k == 0 {
            return Err(IndexError::InvalidTopK);
        }
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                got: query.len(),
            });
        }

        let mut neighbors: Vec<Neighbor> = if self.dimension == 0 {
            (0..self.len()).map(|position| Neighbor { position, score: 0.0 }).collect()
        } else {
            self.data
                .par_chunks_exact(self.dimension)
                .enumerate()
                .map(|(position, row)| Neighbor {
                    position,
                    score: inner_product(query, row),
                })
                .collect()
        };

        if top_k < neighbors.len() {
            neighbors.select_nth_unstable_by(top_k - 1, rank_order);
            neighbors.truncate(top_k);
        }
        neighbors.sort_unstable_by(rank_order);
        Ok(neighbors)
    }
}

/// Search a possibly-absent index.
///
/// No index means nothing was searchable; the result is empty whatever
/// `top_k` is.
pub fn search(index: Option<&FlatIndex>, query: &[f32], top_k: usize) -> IndexResult<Vec<Neighbor>> {
    match index {
        Some(index) => index.search(query, top_k),
        None => Ok(Vec::new()),
    }
}

/// Dot product of two equal-length slices
pub fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Descending score, then ascending position
fn rank_order(a: &Neighbor, b: &Neighbor) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.position.cmp(&b.position))
}
