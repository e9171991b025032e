//! Index statistics.
//!
//! Builds the engine with [`ingest::build_engine`] and prints its
//! [`IndexStats`] plus a per-file document breakdown, so a user can check
//! what an index run picks up before querying. Indexing errors are
//! reported, unlike `query`, which falls back to an empty engine.

use anyhow::Result;
use std::collections::BTreeMap;

use finrag_core::embedding::EmbeddingProvider;
use finrag_core::engine::RetrievalEngine;
use finrag_core::models::{IndexStats, IndexStatus};

use crate::config::Config;
use crate::ingest;

/// Documents per source name, sorted by name.
pub fn documents_per_source(engine: &RetrievalEngine) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for doc in engine.documents() {
        *counts.entry(doc.source_name.clone()).or_insert(0) += 1;
    }
    counts
}

pub fn run_stats(config: &Config, provider: &dyn EmbeddingProvider, json: bool) -> Result<()> {
    let engine = ingest::build_engine(config, provider)?;
    let stats = engine.stats();

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    print_stats(config, &stats);

    let per_source = documents_per_source(&engine);
    if !per_source.is_empty() {
        println!();
        println!("  By source:");
        for (source, count) in &per_source {
            println!("    {:<32} {}", source, count);
        }
    }

    Ok(())
}

fn print_stats(config: &Config, stats: &IndexStats) {
    let status = match stats.status {
        IndexStatus::Active => "active",
        IndexStatus::NotBuilt => "not built",
    };

    println!("finrag index stats");
    println!("==================");
    println!();
    println!("  Root:        {}", config.documents.root.display());
    println!("  Status:      {}", status);
    println!("  Documents:   {}", stats.total_documents);
    match stats.dimension {
        Some(dim) => println!("  Dimension:   {}", dim),
        None => println!("  Dimension:   -"),
    }
    println!("  Index type:  {}", stats.index_type);
    println!("  Generation:  {}", stats.generation);
}
