//! # finrag
//!
//! Semantic retrieval over a small document corpus, for grounding AI
//! answers to finance questions.
//!
//! Documents are loaded from a directory, embedded, and held in an
//! in-memory exact-L2 index. A query is classified (market or general,
//! intent, ticker symbols), embedded with the same provider, matched
//! against the index, filtered by similarity, and packed into a
//! length-bounded context string.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌────────────────┐
//! │ documents/  │──▶│ Extract+Split│──▶│ RetrievalEngine│
//! │  .txt .pdf  │   │    +Embed    │   │ store + index  │
//! └─────────────┘   └──────────────┘   └───────┬────────┘
//!                                              │
//!                                              ▼
//!                     query ──▶ classify ──▶ retrieve ──▶ filter ──▶ pack
//! ```
//!
//! The engine, query processor and classifier live in [`finrag_core`];
//! this crate adds configuration, concrete embedding providers, document
//! loading and the `finrag` CLI.
//!
//! ## Quick Start
//!
//! ```bash
//! finrag index                        # load and embed ./documents
//! finrag query "How did AAPL revenue trend?"
//! finrag classify "Compare AAPL vs MSFT"
//! finrag stats
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`embedding`] | Concrete embedding providers |
//! | [`connector_fs`] | Filesystem document loader |
//! | [`extract`] | Text and PDF extraction |
//! | [`ingest`] | Load, fragment, embed, build |
//! | [`search`] | `query` and `classify` commands |
//! | [`stats`] | `stats` command |

pub mod config;
pub mod connector_fs;
pub mod embedding;
pub mod extract;
pub mod ingest;
pub mod search;
pub mod stats;

pub use finrag_core;
