//! Core data models shared by the store, the index, and the query path.

use serde::Serialize;

/// A fragment as handed over by the document-loading collaborator, before
/// it has been assigned an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    pub content: String,
    /// Display name, usually the file name.
    pub source_name: String,
    /// Where the fragment was loaded from.
    pub origin_path: String,
}

impl NewDocument {
    pub fn new(
        content: impl Into<String>,
        source_name: impl Into<String>,
        origin_path: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            source_name: source_name.into(),
            origin_path: origin_path.into(),
        }
    }
}

/// An ingested fragment.
///
/// `id` is the document's insertion rank within the current store
/// generation and equals the row of its vector in the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub id: usize,
    pub content: String,
    pub source_name: String,
    pub origin_path: String,
}

impl Document {
    pub(crate) fn from_new(id: usize, doc: NewDocument) -> Self {
        Self {
            id,
            content: doc.content,
            source_name: doc.source_name,
            origin_path: doc.origin_path,
        }
    }

    /// Strip the id, e.g. to carry a surviving document into a rebuild.
    pub fn to_new(&self) -> NewDocument {
        NewDocument {
            content: self.content.clone(),
            source_name: self.source_name.clone(),
            origin_path: self.origin_path.clone(),
        }
    }
}

/// One ranked hit joined back to its document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalResult {
    pub document_id: usize,
    /// Squared Euclidean distance to the query vector.
    pub distance: f32,
    /// `1 / (1 + distance)`, in `(0, 1]`.
    pub similarity: f32,
    pub content: String,
    pub source_name: String,
}

/// Aggregate view over a result list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalSummary {
    pub total: usize,
    pub sources: Vec<String>,
    pub avg_similarity: f32,
    pub min_similarity: f32,
    pub max_similarity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexStatus {
    Active,
    NotBuilt,
}

/// Snapshot of the engine's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub status: IndexStatus,
    pub total_documents: usize,
    pub dimension: Option<usize>,
    pub index_type: &'static str,
    pub generation: u64,
}
