//! Embedding provider trait and vector utilities.
//!
//! Defines the [`EmbeddingProvider`] trait that every embedding backend
//! implements, plus pure helpers for distance and similarity computation.
//!
//! The same provider must embed both documents and queries so that all
//! vectors live in one comparable space. Concrete providers (hash, OpenAI,
//! Ollama, fastembed) live in the `finrag` app crate.

use anyhow::{bail, Result};

/// Trait for embedding providers.
///
/// `embed` must fail atomically: either one vector per input text, in input
/// order, or an error. A partial list is never returned.
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `1536`).
    fn dims(&self) -> usize;
    /// Embed a batch of texts.
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Embed a single query text.
///
/// Convenience wrapper around [`EmbeddingProvider::embed`] for the query
/// path. A provider that returns anything other than exactly one vector is
/// treated as a failure.
pub fn embed_query(provider: &dyn EmbeddingProvider, text: &str) -> Result<Vec<f32>> {
    let mut vectors = provider.embed(&[text.to_string()])?;
    if vectors.len() != 1 {
        bail!(
            "provider {} returned {} vectors for one query",
            provider.model_name(),
            vectors.len()
        );
    }
    Ok(vectors.remove(0))
}

/// Squared Euclidean (L2) distance between two vectors.
///
/// Callers are expected to have checked that the lengths agree; extra
/// components of the longer vector are ignored.
///
/// ```rust
/// use finrag_core::embedding::l2_distance_squared;
///
/// assert_eq!(l2_distance_squared(&[0.0, 0.0], &[1.0, 1.0]), 2.0);
/// ```
pub fn l2_distance_squared(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Convert an L2 distance into a similarity score in `(0, 1]`.
///
/// ```text
///                  1
/// similarity = ──────────
///              1 + distance
/// ```
///
/// Strictly decreasing in `distance`, so ranking by similarity descending
/// is the same as ranking by distance ascending.
pub fn similarity_from_distance(distance: f32) -> f32 {
    1.0 / (1.0 + distance)
}
