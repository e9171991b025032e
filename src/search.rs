//! The `query` and `classify` commands.
//!
//! `query` rebuilds the engine from disk, then runs the full query path:
//! classify, retrieve, drop results under the similarity threshold, and
//! pack the survivors into a bounded context string.

use anyhow::Result;
use serde::Serialize;
use tracing::warn;

use finrag_core::classify::{self, Classification, Domain, Intent, QueryType};
use finrag_core::embedding::EmbeddingProvider;
use finrag_core::engine::RetrievalEngine;
use finrag_core::models::{RetrievalResult, RetrievalSummary};
use finrag_core::query::{filter_by_threshold, pack_context, summarize, QueryProcessor};

use crate::config::Config;
use crate::ingest;

/// Per-invocation overrides of the `[retrieval]` settings.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub top_k: Option<usize>,
    pub threshold: Option<f32>,
    pub max_chars: Option<usize>,
    pub enhance: bool,
}

/// Classification in a stable, printable shape.
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationView {
    pub domain: Domain,
    pub intent: Intent,
    pub query_type: QueryType,
    pub symbols: Vec<String>,
    pub lead_in: String,
}

impl ClassificationView {
    pub fn new(query: &str, classification: &Classification) -> Self {
        let symbols: Vec<String> = classification
            .sorted_symbols()
            .into_iter()
            .map(str::to_string)
            .collect();
        let lead_in =
            classify::response_template(classification.intent, symbols.first().map(String::as_str));
        Self {
            domain: classification.domain,
            intent: classification.intent,
            query_type: classify::query_type(query),
            symbols,
            lead_in,
        }
    }
}

/// Everything the query path produced.
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutput {
    pub query: String,
    pub classification: ClassificationView,
    pub results: Vec<RetrievalResult>,
    pub summary: RetrievalSummary,
    pub context: String,
}

/// Run the query path against an already-built engine.
pub fn answer_query(
    engine: &RetrievalEngine,
    provider: &dyn EmbeddingProvider,
    config: &Config,
    query: &str,
    opts: &QueryOptions,
) -> QueryOutput {
    let top_k = opts.top_k.unwrap_or(config.retrieval.top_k);
    let threshold = opts
        .threshold
        .unwrap_or(config.retrieval.similarity_threshold);
    let max_chars = opts
        .max_chars
        .unwrap_or(config.retrieval.max_context_chars);

    let processor = QueryProcessor::new(engine, provider);
    let classification = processor.classify(query);

    let ranked = if opts.enhance {
        processor.retrieve_enhanced(query, top_k)
    } else {
        processor.retrieve(query, top_k)
    };
    let results = filter_by_threshold(ranked, threshold);
    let context = pack_context(&results, max_chars);

    QueryOutput {
        query: query.to_string(),
        classification: ClassificationView::new(query, &classification),
        summary: summarize(&results),
        results,
        context,
    }
}

/// Load and index the documents for a query.
///
/// Loading errors (missing root, bad globs) are returned. An indexing
/// failure, such as a disabled or unreachable embedding provider, is logged
/// and yields an empty engine so the query is still classified and answered
/// without document context.
pub fn engine_for_query(config: &Config, provider: &dyn EmbeddingProvider) -> Result<RetrievalEngine> {
    let docs = ingest::load_documents(config)?;
    match ingest::index_documents(config, provider, docs) {
        Ok(engine) => Ok(engine),
        Err(e) => {
            warn!(error = %format!("{:#}", e), "indexing failed, continuing without document context");
            Ok(RetrievalEngine::new())
        }
    }
}

/// `finrag query <text>`.
pub fn run_query(
    config: &Config,
    provider: &dyn EmbeddingProvider,
    query: &str,
    opts: &QueryOptions,
    json: bool,
) -> Result<()> {
    let engine = engine_for_query(config, provider)?;
    let output = answer_query(&engine, provider, config, query, opts);

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    print_classification(&output.classification);
    println!();

    if output.results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, result) in output.results.iter().enumerate() {
        println!(
            "{}. [{:.3}] {}",
            i + 1,
            result.similarity,
            result.source_name
        );
        println!("    distance: {:.4}", result.distance);
        println!("    id: {}", result.document_id);
        println!(
            "    excerpt: \"{}\"",
            excerpt(&result.content, 120).replace('\n', " ").trim()
        );
        println!();
    }

    let summary = &output.summary;
    println!(
        "similarity: avg {:.3}, min {:.3}, max {:.3}",
        summary.avg_similarity, summary.min_similarity, summary.max_similarity
    );
    println!();
    println!("--- context ({} chars) ---", output.context.chars().count());
    print!("{}", output.context);

    Ok(())
}

/// `finrag classify <text>`. Needs no config.
pub fn run_classify(query: &str, json: bool) -> Result<()> {
    let view = ClassificationView::new(query, &classify::classify(query));
    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print_classification(&view);
    }
    Ok(())
}

fn print_classification(view: &ClassificationView) {
    println!("domain: {}", view.domain.as_str());
    println!("intent: {}", view.intent.as_str());
    println!("query type: {}", view.query_type.as_str());
    if view.symbols.is_empty() {
        println!("symbols: -");
    } else {
        println!("symbols: {}", view.symbols.join(", "));
    }
    println!("lead-in: {}", view.lead_in);
}

/// First `max_chars` characters of `text`, with `...` when cut.
fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChunkingConfig, DocumentsConfig, EmbeddingConfig, RetrievalConfig};
    use crate::embedding::{DisabledProvider, HashProvider};
    use finrag_core::models::NewDocument;
    use std::fs;
    use tempfile::TempDir;

    fn config() -> Config {
        Config {
            documents: DocumentsConfig {
                root: "/unused".into(),
                include_globs: vec!["**/*.txt".to_string()],
                exclude_globs: Vec::new(),
                follow_symlinks: false,
            },
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            embedding: EmbeddingConfig::default(),
        }
    }

    fn engine(provider: &HashProvider) -> RetrievalEngine {
        let mut engine = RetrievalEngine::new();
        engine
            .build(
                provider,
                vec![
                    NewDocument::new("Apple reported record iphone revenue", "aapl.txt", "/d/aapl.txt"),
                    NewDocument::new("Kubernetes docker deployment guide", "ops.txt", "/d/ops.txt"),
                ],
            )
            .unwrap();
        engine
    }

    #[test]
    fn test_answer_query_ranks_and_packs() {
        let provider = HashProvider::new(256).unwrap();
        let engine = engine(&provider);
        let out = answer_query(
            &engine,
            &provider,
            &config(),
            "kubernetes docker deployment",
            &QueryOptions::default(),
        );

        assert_eq!(out.results[0].source_name, "ops.txt");
        assert!(out.context.starts_with("Document: ops.txt\n"));
        assert_eq!(out.summary.total, out.results.len());
    }

    #[test]
    fn test_disabled_provider_degrades_to_empty_engine() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.txt"), "Apple quarterly results").unwrap();
        let mut cfg = config();
        cfg.documents.root = tmp.path().to_path_buf();

        let engine = engine_for_query(&cfg, &DisabledProvider).unwrap();
        assert!(!engine.is_built());

        let out = answer_query(
            &engine,
            &DisabledProvider,
            &cfg,
            "Compare AAPL vs MSFT",
            &QueryOptions::default(),
        );
        assert!(out.results.is_empty());
        assert_eq!(out.context, "");
        assert_eq!(out.classification.domain, Domain::Market);
        assert_eq!(out.classification.symbols, vec!["AAPL".to_string(), "MSFT".to_string()]);
    }

    #[test]
    fn test_engine_for_query_still_reports_missing_root() {
        let mut cfg = config();
        cfg.documents.root = "/nonexistent/finrag-docs".into();
        assert!(engine_for_query(&cfg, &DisabledProvider).is_err());
    }

    #[test]
    fn test_threshold_override_drops_everything() {
        let provider = HashProvider::new(128).unwrap();
        let engine = engine(&provider);
        let opts = QueryOptions {
            threshold: Some(1.0),
            ..QueryOptions::default()
        };
        let out = answer_query(&engine, &provider, &config(), "unrelated words", &opts);
        assert!(out.results.is_empty());
        assert_eq!(out.context, "");
        assert_eq!(out.summary.total, 0);
    }

    #[test]
    fn test_empty_engine_yields_no_results() {
        let provider = HashProvider::new(16).unwrap();
        let engine = RetrievalEngine::new();
        let out = answer_query(&engine, &provider, &config(), "AAPL price", &QueryOptions::default());
        assert!(out.results.is_empty());
        assert_eq!(out.classification.symbols, vec!["AAPL".to_string()]);
        assert_eq!(out.classification.intent, Intent::Price);
    }

    #[test]
    fn test_classification_view_sorted_and_lead_in() {
        let view = ClassificationView::new("Compare MSFT vs AAPL", &classify::classify("Compare MSFT vs AAPL"));
        assert_eq!(view.symbols, vec!["AAPL".to_string(), "MSFT".to_string()]);
        assert_eq!(view.query_type, QueryType::Comparison);
        assert_eq!(view.lead_in, "Here's the comparison analysis:");
    }

    #[test]
    fn test_excerpt() {
        assert_eq!(excerpt("short", 10), "short");
        assert_eq!(excerpt("ééééé", 2), "éé...");
    }
}
