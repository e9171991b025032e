//! # finrag CLI
//!
//! ```bash
//! finrag --config ./config/finrag.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `finrag index` | Load, embed and index the documents directory |
//! | `finrag query "<text>"` | Classify, retrieve and pack context for a question |
//! | `finrag classify "<text>"` | Classify a question (no config needed) |
//! | `finrag stats` | Show index statistics |
//!
//! Nothing is persisted between runs; each command rebuilds the index.
//! Logs go to stderr and are controlled by `RUST_LOG` (default `warn`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use finrag::config;
use finrag::embedding::create_provider;
use finrag::ingest;
use finrag::search::{self, QueryOptions};
use finrag::stats;

/// finrag: semantic retrieval over a document directory, packed into a
/// bounded context for AI answers.
#[derive(Parser)]
#[command(
    name = "finrag",
    about = "Semantic retrieval and context packing for finance questions",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/finrag.toml`. See `config/finrag.example.toml`.
    #[arg(long, global = true, default_value = "./config/finrag.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load, embed and index the configured documents.
    Index,

    /// Answer-side retrieval for a question.
    ///
    /// Prints the classification, the ranked results that pass the
    /// similarity threshold, and the packed context.
    Query {
        /// The question.
        query: String,

        /// Number of nearest documents to retrieve (overrides `retrieval.top_k`).
        #[arg(long)]
        top_k: Option<usize>,

        /// Minimum similarity to keep (overrides `retrieval.similarity_threshold`).
        #[arg(long)]
        threshold: Option<f32>,

        /// Context budget in characters (overrides `retrieval.max_context_chars`).
        #[arg(long)]
        max_chars: Option<usize>,

        /// Expand the query with its query-type phrase before embedding.
        #[arg(long)]
        enhance: bool,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Classify a question: domain, intent, query type and symbols.
    Classify {
        /// The question.
        query: String,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Show index statistics.
    Stats {
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Commands that don't require config
    if let Commands::Classify { query, json } = &cli.command {
        return search::run_classify(query, *json);
    }

    let cfg = config::load_config(&cli.config)?;
    let provider = create_provider(&cfg.embedding)?;

    match cli.command {
        Commands::Index => {
            ingest::run_index(&cfg, provider.as_ref())?;
        }
        Commands::Query {
            query,
            top_k,
            threshold,
            max_chars,
            enhance,
            json,
        } => {
            let opts = QueryOptions {
                top_k,
                threshold,
                max_chars,
                enhance,
            };
            search::run_query(&cfg, provider.as_ref(), &query, &opts, json)?;
        }
        Commands::Stats { json } => {
            stats::run_stats(&cfg, provider.as_ref(), json)?;
        }
        Commands::Classify { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
