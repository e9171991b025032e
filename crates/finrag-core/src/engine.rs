//! The retrieval engine: a document store and a vector index owned as one
//! unit and always mutated together.
//!
//! # Invariant
//!
//! After every successful mutation, `index.count() == store.count()` and the
//! vector in row `i` belongs to the document with id `i`. Mutations validate
//! their whole input before touching either structure, so a failed call
//! leaves the last consistent state in place.
//!
//! # Lifecycle
//!
//! | Method | Effect |
//! |--------|--------|
//! | [`build`](RetrievalEngine::build) | Replace everything with a new document set |
//! | [`add`](RetrievalEngine::add) | Append to a built engine |
//! | [`ingest`](RetrievalEngine::ingest) | `build` when empty, `add` otherwise |
//! | [`rebuild`](RetrievalEngine::rebuild) | Replace membership (ids reassigned) |
//! | [`remove_where`](RetrievalEngine::remove_where) | Re-embed and rebuild the surviving set |
//! | [`clear`](RetrievalEngine::clear) | Drop both structures |
//!
//! The index has no delete operation, so removal is always a full rebuild.
//!
//! The engine is single-writer. A multi-threaded host must guard the whole
//! engine with one lock (or swap whole engines) so a search never observes
//! a vector count that differs from the document count it joins against.

use tracing::{debug, info};

use crate::embedding::EmbeddingProvider;
use crate::error::{Result, RetrievalError};
use crate::index::VectorIndex;
use crate::models::{Document, IndexStats, IndexStatus, NewDocument};
use crate::store::DocumentStore;

#[derive(Debug, Default)]
pub struct RetrievalEngine {
    store: DocumentStore,
    index: VectorIndex,
    generation: u64,
}

impl RetrievalEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Embed `docs` with one provider call and build a fresh engine state.
    ///
    /// Returns the number of documents committed.
    pub fn build(
        &mut self,
        provider: &dyn EmbeddingProvider,
        docs: Vec<NewDocument>,
    ) -> Result<usize> {
        if docs.is_empty() {
            return Err(RetrievalError::EmptyInput);
        }
        let embeddings = embed_documents(provider, &docs)?;
        self.build_with_embeddings(docs, embeddings)
    }

    /// Build from vectors computed elsewhere. `embeddings[i]` belongs to `docs[i]`.
    pub fn build_with_embeddings(
        &mut self,
        docs: Vec<NewDocument>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<usize> {
        check_counts(&docs, &embeddings)?;
        let dim = embeddings.first().map_or(0, Vec::len);
        self.index.build(&embeddings, dim)?;
        self.store.replace_all(docs);
        self.generation += 1;
        self.debug_check();

        info!(
            documents = self.store.count(),
            dimension = dim,
            generation = self.generation,
            "built vector index"
        );
        Ok(self.store.count())
    }

    /// Embed `docs` and append them. Fails with [`RetrievalError::NotBuilt`]
    /// if nothing has been built yet. An empty batch on a built engine is a
    /// no-op returning `Ok(0)`, without calling the provider.
    pub fn add(&mut self, provider: &dyn EmbeddingProvider, docs: Vec<NewDocument>) -> Result<usize> {
        if !self.index.is_built() {
            return Err(RetrievalError::NotBuilt);
        }
        if docs.is_empty() {
            return Ok(0);
        }
        let embeddings = embed_documents(provider, &docs)?;
        self.add_with_embeddings(docs, embeddings)
    }

    /// Append documents with precomputed vectors. Existing ids are unchanged.
    ///
    /// Same empty-batch rule as [`add`](Self::add): `NotBuilt` before a
    /// build, `Ok(0)` after.
    pub fn add_with_embeddings(
        &mut self,
        docs: Vec<NewDocument>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<usize> {
        if !self.index.is_built() {
            return Err(RetrievalError::NotBuilt);
        }
        if docs.is_empty() && embeddings.is_empty() {
            return Ok(0);
        }
        check_counts(&docs, &embeddings)?;
        self.index.add(&embeddings)?;
        let committed = self.store.append(docs);
        self.debug_check();

        info!(
            added = committed,
            documents = self.store.count(),
            "added documents to vector index"
        );
        Ok(committed)
    }

    /// Build when nothing is indexed yet, add otherwise.
    pub fn ingest(
        &mut self,
        provider: &dyn EmbeddingProvider,
        docs: Vec<NewDocument>,
    ) -> Result<usize> {
        if self.index.is_built() {
            self.add(provider, docs)
        } else {
            self.build(provider, docs)
        }
    }

    /// Replace the document set, reassigning ids `0..n-1`.
    pub fn rebuild(
        &mut self,
        provider: &dyn EmbeddingProvider,
        docs: Vec<NewDocument>,
    ) -> Result<usize> {
        if docs.is_empty() {
            return Err(RetrievalError::EmptyInput);
        }
        let embeddings = embed_documents(provider, &docs)?;
        self.rebuild_with_embeddings(docs, embeddings)
    }

    pub fn rebuild_with_embeddings(
        &mut self,
        docs: Vec<NewDocument>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<usize> {
        check_counts(&docs, &embeddings)?;
        let dim = embeddings.first().map_or(0, Vec::len);
        self.index.rebuild(&embeddings, dim)?;
        self.store.replace_all(docs);
        self.generation += 1;
        self.debug_check();

        info!(
            documents = self.store.count(),
            dimension = dim,
            generation = self.generation,
            "rebuilt vector index"
        );
        Ok(self.store.count())
    }

    /// Remove every document matching `predicate` by re-embedding and
    /// rebuilding the survivors.
    ///
    /// Returns the number of documents removed. Removing everything clears
    /// the engine back to the unbuilt state. On error nothing changes.
    pub fn remove_where<F>(&mut self, provider: &dyn EmbeddingProvider, predicate: F) -> Result<usize>
    where
        F: Fn(&Document) -> bool,
    {
        let before = self.store.count();
        let survivors: Vec<NewDocument> = self
            .store
            .iter()
            .filter(|doc| !predicate(doc))
            .map(Document::to_new)
            .collect();
        let removed = before - survivors.len();

        if removed == 0 {
            debug!("remove matched no documents");
            return Ok(0);
        }
        if survivors.is_empty() {
            self.clear();
            return Ok(removed);
        }

        self.rebuild(provider, survivors)?;
        Ok(removed)
    }

    /// Remove all fragments loaded from the named source.
    pub fn remove_source(
        &mut self,
        provider: &dyn EmbeddingProvider,
        source_name: &str,
    ) -> Result<usize> {
        self.remove_where(provider, |doc| doc.source_name == source_name)
    }

    pub fn clear(&mut self) {
        self.store.clear();
        self.index.clear();
        self.generation += 1;
        info!(generation = self.generation, "cleared document store and index");
    }

    /// `(id, squared distance)` for the `k` nearest documents.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        self.index.search(query, k)
    }

    pub fn document(&self, id: usize) -> Option<&Document> {
        self.store.get(id)
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.store.iter()
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.store.count()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn is_built(&self) -> bool {
        self.index.is_built()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.index.dimension()
    }

    /// Bumped on every build, rebuild, and clear; ids from an older
    /// generation may point at different documents.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            status: if self.index.is_built() {
                IndexStatus::Active
            } else {
                IndexStatus::NotBuilt
            },
            total_documents: self.store.count(),
            dimension: self.index.dimension(),
            index_type: self.index.kind(),
            generation: self.generation,
        }
    }

    fn debug_check(&self) {
        debug_assert_eq!(
            self.index.count(),
            self.store.count(),
            "vector index and document store out of step"
        );
    }
}

/// One provider call per batch; the provider must return one vector per text.
fn embed_documents(
    provider: &dyn EmbeddingProvider,
    docs: &[NewDocument],
) -> Result<Vec<Vec<f32>>> {
    let texts: Vec<String> = docs.iter().map(|d| d.content.clone()).collect();
    provider
        .embed(&texts)
        .map_err(|e| RetrievalError::EncodingFailed(e.to_string()))
}

fn check_counts(docs: &[NewDocument], embeddings: &[Vec<f32>]) -> Result<()> {
    if docs.is_empty() && embeddings.is_empty() {
        return Err(RetrievalError::EmptyInput);
    }
    if docs.len() != embeddings.len() {
        return Err(RetrievalError::CountMismatch {
            documents: docs.len(),
            embeddings: embeddings.len(),
        });
    }
    Ok(())
}
