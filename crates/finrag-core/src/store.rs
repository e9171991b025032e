//! Ordered, id-addressable storage of ingested fragments.
//!
//! Ids are dense and contiguous within a store generation: the document at
//! position `i` has id `i`. The store is the source of truth for content
//! returned to callers.
//!
//! Mutators are crate-private. Only [`RetrievalEngine`](crate::engine::RetrievalEngine)
//! calls them, always together with the matching vector index mutation.

use crate::models::{Document, NewDocument};

#[derive(Debug, Default, Clone)]
pub struct DocumentStore {
    docs: Vec<Document>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append documents, assigning each the next sequential id.
    ///
    /// Returns the number of documents committed. Existing entries are
    /// never reordered.
    pub(crate) fn append(&mut self, docs: Vec<NewDocument>) -> usize {
        let start = self.docs.len();
        let committed = docs.len();
        self.docs.reserve(committed);
        for (offset, doc) in docs.into_iter().enumerate() {
            self.docs.push(Document::from_new(start + offset, doc));
        }
        committed
    }

    /// Swap the whole collection, reassigning ids `0..n-1`.
    pub(crate) fn replace_all(&mut self, docs: Vec<NewDocument>) {
        self.docs = docs
            .into_iter()
            .enumerate()
            .map(|(id, doc)| Document::from_new(id, doc))
            .collect();
    }

    pub(crate) fn clear(&mut self) {
        self.docs.clear();
    }

    /// O(1) lookup. `None` for ids outside the current generation, which
    /// happens when a search result outlives a rebuild.
    pub fn get(&self, id: usize) -> Option<&Document> {
        self.docs.get(id)
    }

    pub fn count(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.docs.iter()
    }
}
