//! Ingestion: load documents from disk, optionally split them into
//! fragments, embed, and build the retrieval engine.
//!
//! Nothing is persisted; every command that needs an index rebuilds it
//! from the documents directory.

use anyhow::{Context, Result};
use tracing::{info, warn};

use finrag_core::chunk::split_fragments;
use finrag_core::embedding::EmbeddingProvider;
use finrag_core::engine::RetrievalEngine;
use finrag_core::models::NewDocument;

use crate::config::Config;
use crate::connector_fs;

/// Scan the documents root and apply fragmenting when configured.
pub fn load_documents(config: &Config) -> Result<Vec<NewDocument>> {
    let files = connector_fs::scan_documents(&config.documents)?;
    let file_count = files.len();

    let docs = match config.chunking.max_tokens {
        Some(max_tokens) => fragment_documents(files, max_tokens),
        None => files,
    };

    info!(files = file_count, documents = docs.len(), "loaded documents");
    Ok(docs)
}

/// Split each document into fragments that keep the file's source name
/// and origin path.
pub fn fragment_documents(docs: Vec<NewDocument>, max_tokens: usize) -> Vec<NewDocument> {
    docs.into_iter()
        .flat_map(|doc| {
            split_fragments(&doc.content, max_tokens)
                .into_iter()
                .map(move |fragment| {
                    NewDocument::new(fragment, doc.source_name.clone(), doc.origin_path.clone())
                })
        })
        .collect()
}

/// Load, embed, and index the configured documents.
///
/// An empty documents directory yields an empty, unbuilt engine rather than
/// an error; queries against it return no results.
pub fn build_engine(config: &Config, provider: &dyn EmbeddingProvider) -> Result<RetrievalEngine> {
    let docs = load_documents(config)?;
    index_documents(config, provider, docs)
}

/// Embed and index already-loaded documents.
pub fn index_documents(
    config: &Config,
    provider: &dyn EmbeddingProvider,
    docs: Vec<NewDocument>,
) -> Result<RetrievalEngine> {
    let mut engine = RetrievalEngine::new();

    if docs.is_empty() {
        warn!(
            root = %config.documents.root.display(),
            "no documents found; index left empty"
        );
        return Ok(engine);
    }

    engine
        .build(provider, docs)
        .with_context(|| format!("Failed to index documents with {}", provider.model_name()))?;
    Ok(engine)
}

/// `finrag index`: build the index and report what went in.
pub fn run_index(config: &Config, provider: &dyn EmbeddingProvider) -> Result<()> {
    let engine = build_engine(config, provider)?;
    let stats = engine.stats();

    let mut files: Vec<&str> = engine
        .documents()
        .map(|d| d.origin_path.as_str())
        .collect();
    files.dedup();

    println!("index {}", config.documents.root.display());
    println!("  files: {}", files.len());
    println!("  documents indexed: {}", stats.total_documents);
    match stats.dimension {
        Some(dim) => println!("  dimension: {}", dim),
        None => println!("  dimension: -"),
    }
    println!("  generation: {}", stats.generation);
    println!("  model: {}", provider.model_name());
    println!("ok");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_documents_keeps_provenance() {
        let docs = vec![
            NewDocument::new("first\n\nsecond", "a.txt", "/d/a.txt"),
            NewDocument::new("three", "b.txt", "/d/b.txt"),
        ];
        let out = fragment_documents(docs, 2);
        let view: Vec<(&str, &str)> = out
            .iter()
            .map(|d| (d.content.as_str(), d.source_name.as_str()))
            .collect();
        assert_eq!(
            view,
            vec![("first", "a.txt"), ("second", "a.txt"), ("three", "b.txt")]
        );
        assert_eq!(out[1].origin_path, "/d/a.txt");
    }
}
