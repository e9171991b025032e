//! Error taxonomy for index mutation and text encoding.
//!
//! Lookup misses are not errors: [`DocumentStore::get`](crate::store::DocumentStore::get)
//! returns `None` so joins against stale ids can drop them silently.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RetrievalError {
    /// Nothing to index.
    #[error("no documents or embeddings to index")]
    EmptyInput,

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Search or add attempted before any successful build.
    #[error("vector index has not been built")]
    NotBuilt,

    /// The embedding provider failed, for documents or for a query.
    #[error("embedding failed: {0}")]
    EncodingFailed(String),

    /// Embedding list and document list disagree in length.
    #[error("{embeddings} embeddings supplied for {documents} documents")]
    CountMismatch { documents: usize, embeddings: usize },
}

pub type Result<T> = std::result::Result<T, RetrievalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_failed_message_is_neutral() {
        let msg = RetrievalError::EncodingFailed("provider is disabled".to_string()).to_string();
        assert_eq!(msg, "embedding failed: provider is disabled");
    }
}
