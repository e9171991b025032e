//! Exact nearest-neighbour search over dense vectors.
//!
//! [`VectorIndex`] stores one vector per document, row `i` belonging to the
//! document with id `i`. Search is brute force: squared L2 distance from the
//! query to every stored row, smallest `k` returned ascending.
//!
//! Exact search keeps recall at 100% for the small corpora this engine is
//! built for. Swapping in an approximate structure changes that contract
//! and has to restate its recall guarantees.
//!
//! # Mutation rules
//!
//! - [`build`](VectorIndex::build) / [`rebuild`](VectorIndex::rebuild)
//!   replace everything and fix the dimension for the new index.
//! - [`add`](VectorIndex::add) appends rows and requires a built index with
//!   a matching dimension.
//! - Every input is validated before anything is written, so a failed call
//!   leaves the previous index untouched.

use std::cmp::Ordering;

use crate::embedding::l2_distance_squared;
use crate::error::{Result, RetrievalError};

/// Identifier reported by [`VectorIndex::kind`].
pub const INDEX_KIND: &str = "exact-l2-flat";

#[derive(Debug, Clone)]
struct FlatIndex {
    dimension: usize,
    /// Row-major, `count * dimension` values.
    data: Vec<f32>,
}

impl FlatIndex {
    fn count(&self) -> usize {
        self.data.len() / self.dimension
    }

    fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.dimension..(i + 1) * self.dimension]
    }
}

#[derive(Debug, Default, Clone)]
pub struct VectorIndex {
    inner: Option<FlatIndex>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a fresh index of dimension `dim`, replacing any prior one.
    ///
    /// Fails with [`RetrievalError::EmptyInput`] for an empty set and
    /// [`RetrievalError::DimensionMismatch`] if any vector is not `dim` long.
    pub(crate) fn build(&mut self, embeddings: &[Vec<f32>], dim: usize) -> Result<()> {
        // zero-length vectors carry nothing to search
        if embeddings.is_empty() || dim == 0 {
            return Err(RetrievalError::EmptyInput);
        }
        check_dimensions(embeddings, dim)?;

        let mut data = Vec::with_capacity(embeddings.len() * dim);
        for v in embeddings {
            data.extend_from_slice(v);
        }
        self.inner = Some(FlatIndex {
            dimension: dim,
            data,
        });
        Ok(())
    }

    /// Append rows without disturbing existing ids.
    pub(crate) fn add(&mut self, embeddings: &[Vec<f32>]) -> Result<()> {
        let index = self.inner.as_mut().ok_or(RetrievalError::NotBuilt)?;
        check_dimensions(embeddings, index.dimension)?;

        index.data.reserve(embeddings.len() * index.dimension);
        for v in embeddings {
            index.data.extend_from_slice(v);
        }
        Ok(())
    }

    /// Discard-then-build, committed only if the new set is valid.
    pub(crate) fn rebuild(&mut self, embeddings: &[Vec<f32>], dim: usize) -> Result<()> {
        self.build(embeddings, dim)
    }

    pub(crate) fn clear(&mut self) {
        self.inner = None;
    }

    /// Return the `k` nearest rows as `(id, squared distance)`, ascending.
    ///
    /// `k` is clamped to the number of stored vectors. Equal distances keep
    /// ascending id order. Fails with [`RetrievalError::NotBuilt`] before the
    /// first build and [`RetrievalError::DimensionMismatch`] when the query
    /// length differs from the index dimension.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        let index = self.inner.as_ref().ok_or(RetrievalError::NotBuilt)?;
        if query.len() != index.dimension {
            return Err(RetrievalError::DimensionMismatch {
                expected: index.dimension,
                actual: query.len(),
            });
        }

        let k = k.min(index.count());
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut hits: Vec<(usize, f32)> = (0..index.count())
            .map(|i| (i, l2_distance_squared(query, index.row(i))))
            .collect();

        hits.sort_by(|a, b| compare_distance(a.1, b.1).then(a.0.cmp(&b.0)));
        hits.truncate(k);
        Ok(hits)
    }

    /// Number of stored vectors (0 when unbuilt).
    pub fn count(&self) -> usize {
        self.inner.as_ref().map_or(0, FlatIndex::count)
    }

    pub fn dimension(&self) -> Option<usize> {
        self.inner.as_ref().map(|i| i.dimension)
    }

    pub fn is_built(&self) -> bool {
        self.inner.is_some()
    }

    pub fn kind(&self) -> &'static str {
        INDEX_KIND
    }
}

fn check_dimensions(embeddings: &[Vec<f32>], dim: usize) -> Result<()> {
    match embeddings.iter().find(|v| v.len() != dim) {
        Some(bad) => Err(RetrievalError::DimensionMismatch {
            expected: dim,
            actual: bad.len(),
        }),
        None => Ok(()),
    }
}

/// NaN distances sort after every real distance.
fn compare_distance(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (true, true) => Ordering::Equal,
    }
}
