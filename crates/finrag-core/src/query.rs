//! Query processing: encode, search, join, score, filter, and pack.
//!
//! [`QueryProcessor`] borrows a [`RetrievalEngine`] and the
//! [`EmbeddingProvider`] the engine was built with. It never mutates the
//! engine.
//!
//! # Pipeline
//!
//! 1. Encode the query with the provider (one vector).
//! 2. Search the index for the `top_k` nearest rows.
//! 3. Join each `(id, distance)` back to the document store; ids that no
//!    longer resolve are dropped.
//! 4. Score with `similarity = 1 / (1 + distance)` and sort descending
//!    (stable, so equal similarities keep search order).
//!
//! Retrieval degrades to an empty list instead of failing: an unbuilt
//! index, an encoding failure, or a dimension mismatch all mean "no
//! context", and the caller's answer flow carries on without it.

use tracing::{debug, warn};

use crate::classify::{self, Classification, QueryType};
use crate::embedding::{embed_query, similarity_from_distance, EmbeddingProvider};
use crate::engine::RetrievalEngine;
use crate::error::{Result, RetrievalError};
use crate::models::{RetrievalResult, RetrievalSummary};

pub struct QueryProcessor<'a> {
    engine: &'a RetrievalEngine,
    provider: &'a dyn EmbeddingProvider,
}

impl<'a> QueryProcessor<'a> {
    pub fn new(engine: &'a RetrievalEngine, provider: &'a dyn EmbeddingProvider) -> Self {
        Self { engine, provider }
    }

    /// Encode a query. A provider failure is terminal for this query; no
    /// fallback vector is made up.
    pub fn encode(&self, query: &str) -> Result<Vec<f32>> {
        embed_query(self.provider, query).map_err(|e| RetrievalError::EncodingFailed(e.to_string()))
    }

    /// Ranked results for `query`, best first. Never fails; see module docs.
    pub fn retrieve(&self, query: &str, top_k: usize) -> Vec<RetrievalResult> {
        match self.encode(query) {
            Ok(vector) => self.retrieve_by_vector(&vector, top_k),
            Err(e) => {
                warn!(error = %e, "query encoding failed, continuing without context");
                Vec::new()
            }
        }
    }

    /// [`retrieve`](Self::retrieve) with the query first expanded by its
    /// [`QueryType`] phrase.
    pub fn retrieve_enhanced(&self, query: &str, top_k: usize) -> Vec<RetrievalResult> {
        let enhanced = classify::enhance_query(query, classify::query_type(query));
        debug!(query = %enhanced, "retrieving with enhanced query");
        self.retrieve(&enhanced, top_k)
    }

    /// The post-encoding half of [`retrieve`](Self::retrieve).
    pub fn retrieve_by_vector(&self, query_vector: &[f32], top_k: usize) -> Vec<RetrievalResult> {
        let hits = match self.engine.search(query_vector, top_k) {
            Ok(hits) => hits,
            Err(RetrievalError::NotBuilt) => {
                debug!("vector index not built, no context");
                return Vec::new();
            }
            Err(e) => {
                warn!(error = %e, "vector search failed, continuing without context");
                return Vec::new();
            }
        };

        let mut results: Vec<RetrievalResult> = hits
            .into_iter()
            .filter_map(|(id, distance)| match self.engine.document(id) {
                Some(doc) => Some(RetrievalResult {
                    document_id: id,
                    distance,
                    similarity: similarity_from_distance(distance),
                    content: doc.content.clone(),
                    source_name: doc.source_name.clone(),
                }),
                None => {
                    debug!(id, "dropping stale search hit");
                    None
                }
            })
            .collect();

        // sort_by is stable: ties keep ascending-distance search order
        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results
    }

    pub fn classify(&self, query: &str) -> Classification {
        classify::classify(query)
    }

    pub fn query_type(&self, query: &str) -> QueryType {
        classify::query_type(query)
    }
}

/// Keep results with `similarity >= threshold`, preserving order.
pub fn filter_by_threshold(results: Vec<RetrievalResult>, threshold: f32) -> Vec<RetrievalResult> {
    results
        .into_iter()
        .filter(|r| r.similarity >= threshold)
        .collect()
}

/// Concatenate result blocks into a context string of at most `max_chars`
/// characters.
///
/// Each block is `"Document: {source_name}\n{content}\n---\n"`. Blocks are
/// added in the given order and packing stops before the first block that
/// would overflow the budget. The first block is always included, even if
/// it alone exceeds `max_chars`, so a long best match never produces an
/// empty context. An empty input yields `""`.
pub fn pack_context(results: &[RetrievalResult], max_chars: usize) -> String {
    let mut context = String::new();
    let mut used = 0usize;

    for (i, result) in results.iter().enumerate() {
        let block = format!(
            "Document: {}\n{}\n---\n",
            result.source_name, result.content
        );
        let len = block.chars().count();
        if i > 0 && used + len > max_chars {
            break;
        }
        context.push_str(&block);
        used += len;
    }

    context
}

/// Count, sources, and similarity spread of a result list.
pub fn summarize(results: &[RetrievalResult]) -> RetrievalSummary {
    if results.is_empty() {
        return RetrievalSummary {
            total: 0,
            sources: Vec::new(),
            avg_similarity: 0.0,
            min_similarity: 0.0,
            max_similarity: 0.0,
        };
    }

    let similarities = results.iter().map(|r| r.similarity);
    let sum: f32 = similarities.clone().sum();

    RetrievalSummary {
        total: results.len(),
        sources: results.iter().map(|r| r.source_name.clone()).collect(),
        avg_similarity: sum / results.len() as f32,
        min_similarity: similarities.clone().fold(f32::INFINITY, f32::min),
        max_similarity: similarities.fold(f32::NEG_INFINITY, f32::max),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewDocument;

    /// Maps known texts to fixed 2-d points; anything else fails.
    struct TableProvider;

    impl EmbeddingProvider for TableProvider {
        fn model_name(&self) -> &str {
            "table"
        }
        fn dims(&self) -> usize {
            2
        }
        fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            texts
                .iter()
                .map(|t| match t.as_str() {
                    "origin" | "near origin" => Ok(vec![0.0, 0.0]),
                    "far" => Ok(vec![10.0, 10.0]),
                    "mid" => Ok(vec![3.0, 3.0]),
                    "q" => Ok(vec![1.0, 1.0]),
                    "wide" => Ok(vec![1.0, 1.0, 1.0]),
                    other => anyhow::bail!("no embedding for {:?}", other),
                })
                .collect()
        }
    }

    fn result(name: &str, content: &str, distance: f32) -> RetrievalResult {
        RetrievalResult {
            document_id: 0,
            distance,
            similarity: similarity_from_distance(distance),
            content: content.to_string(),
            source_name: name.to_string(),
        }
    }

    fn engine() -> RetrievalEngine {
        let mut engine = RetrievalEngine::new();
        engine
            .build(
                &TableProvider,
                vec![
                    NewDocument::new("far", "far.txt", "/d/far.txt"),
                    NewDocument::new("origin", "origin.txt", "/d/origin.txt"),
                    NewDocument::new("mid", "mid.txt", "/d/mid.txt"),
                ],
            )
            .unwrap();
        engine
    }

    #[test]
    fn test_retrieve_ranked_by_similarity() {
        let engine = engine();
        let qp = QueryProcessor::new(&engine, &TableProvider);
        let results = qp.retrieve("q", 3);

        let names: Vec<&str> = results.iter().map(|r| r.source_name.as_str()).collect();
        assert_eq!(names, vec!["origin.txt", "mid.txt", "far.txt"]);
        assert_eq!(results[0].distance, 2.0);
        assert!((results[0].similarity - 1.0 / 3.0).abs() < 1e-6);
        for pair in results.windows(2) {
            assert!(pair[0].similarity >= pair[1].similarity);
            assert!(pair[0].distance <= pair[1].distance);
        }
    }

    #[test]
    fn test_retrieve_top_k() {
        let engine = engine();
        let qp = QueryProcessor::new(&engine, &TableProvider);
        let results = qp.retrieve("q", 1);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document_id, 1);
    }

    #[test]
    fn test_retrieve_unbuilt_is_empty() {
        let engine = RetrievalEngine::new();
        let qp = QueryProcessor::new(&engine, &TableProvider);
        assert!(qp.retrieve("q", 5).is_empty());
    }

    #[test]
    fn test_retrieve_encoding_failure_is_empty() {
        let engine = engine();
        let qp = QueryProcessor::new(&engine, &TableProvider);
        assert!(matches!(
            qp.encode("unknown"),
            Err(RetrievalError::EncodingFailed(_))
        ));
        assert!(qp.retrieve("unknown", 5).is_empty());
    }

    #[test]
    fn test_retrieve_dimension_mismatch_is_empty() {
        let engine = engine();
        let qp = QueryProcessor::new(&engine, &TableProvider);
        assert!(qp.retrieve("wide", 5).is_empty());
    }

    #[test]
    fn test_equal_similarity_keeps_search_order() {
        let mut engine = RetrievalEngine::new();
        engine
            .build(
                &TableProvider,
                vec![
                    NewDocument::new("origin", "first.txt", "/d/1"),
                    NewDocument::new("near origin", "second.txt", "/d/2"),
                ],
            )
            .unwrap();
        let qp = QueryProcessor::new(&engine, &TableProvider);
        let results = qp.retrieve("q", 2);
        assert_eq!(results[0].source_name, "first.txt");
        assert_eq!(results[1].source_name, "second.txt");
    }

    #[test]
    fn test_filter_by_threshold() {
        let results = vec![
            result("a", "a", 0.0),
            result("b", "b", 4.0),
            result("c", "c", 1.0),
        ];
        let kept = filter_by_threshold(results, 0.5);
        let names: Vec<&str> = kept.iter().map(|r| r.source_name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn test_filter_threshold_is_inclusive() {
        let kept = filter_by_threshold(vec![result("a", "a", 1.0)], 0.5);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_pack_empty() {
        assert_eq!(pack_context(&[], 2000), "");
    }

    #[test]
    fn test_pack_first_block_always_included() {
        let packed = pack_context(&[result("a.txt", "long content", 0.0)], 0);
        assert_eq!(packed, "Document: a.txt\nlong content\n---\n");
    }

    #[test]
    fn test_pack_stops_before_overflow() {
        let results = vec![
            result("a.txt", "aaaa", 0.0),
            result("b.txt", "bbbb", 1.0),
            result("c.txt", "c", 2.0),
        ];
        let block_len = "Document: a.txt\naaaa\n---\n".len();
        let packed = pack_context(&results, block_len * 2 - 1);
        assert_eq!(packed, "Document: a.txt\naaaa\n---\n");

        // stops at b even though c alone would still fit
        let c_len = "Document: c.txt\nc\n---\n".len();
        let packed = pack_context(&results, block_len + c_len);
        assert!(!packed.contains("c.txt"));
    }

    #[test]
    fn test_pack_within_budget() {
        let results: Vec<RetrievalResult> = (0..10)
            .map(|i| result(&format!("doc{}.txt", i), "some text", i as f32))
            .collect();
        let packed = pack_context(&results, 120);
        assert!(packed.chars().count() <= 120);
        assert!(packed.starts_with("Document: doc0.txt\n"));
    }

    #[test]
    fn test_pack_counts_characters() {
        let results = vec![result("é.txt", "ééé", 0.0), result("b.txt", "b", 1.0)];
        let first = "Document: é.txt\nééé\n---\n".chars().count();
        let second = "Document: b.txt\nb\n---\n".chars().count();
        let packed = pack_context(&results, first + second);
        assert!(packed.contains("b.txt"));
    }

    #[test]
    fn test_summarize() {
        let summary = summarize(&[result("a", "a", 0.0), result("b", "b", 1.0)]);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.sources, vec!["a", "b"]);
        assert!((summary.avg_similarity - 0.75).abs() < 1e-6);
        assert_eq!(summary.min_similarity, 0.5);
        assert_eq!(summary.max_similarity, 1.0);
    }

    #[test]
    fn test_summarize_empty() {
        let summary = summarize(&[]);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.avg_similarity, 0.0);
    }
}
