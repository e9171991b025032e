//! # finrag core
//!
//! Synchronous, in-memory semantic retrieval: an id-aligned document store
//! and exact L2 vector index owned together by a [`engine::RetrievalEngine`],
//! a [`query::QueryProcessor`] that turns a free-text query into a ranked,
//! budget-packed context string, and a stateless [`classify`] module that
//! tags market-data queries.
//!
//! This crate has no filesystem, network, or async dependencies. The text
//! embedding function is injected through [`embedding::EmbeddingProvider`];
//! concrete providers live in the `finrag` app crate.
//!
//! ## Data Flow
//!
//! ```text
//! documents ──▶ EmbeddingProvider ──▶ (vector, document) ──▶ RetrievalEngine
//!                                                            ├─ DocumentStore
//!                                                            └─ VectorIndex
//! query ──▶ EmbeddingProvider ──▶ VectorIndex::search ──▶ DocumentStore::get
//!       ──▶ similarity + ranking ──▶ threshold filter ──▶ pack_context
//! ```

pub mod chunk;
pub mod classify;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod index;
pub mod models;
pub mod query;
pub mod store;

pub use error::{Result, RetrievalError};
