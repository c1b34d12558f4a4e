#![forbid(unsafe_code)]
//! quill-search library.
//!
//! Reciprocal Rank Fusion of lexical and dense-semantic rankings, the
//! gateway to the external search engine, and the request bodies it is sent.
//!
//! # Conventions
//!
//! - **Errors**: Library functions return `Result<_, quill_core::SearchError>`.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod fusion;
pub mod gateway;
pub mod query;
pub mod service;

pub use fusion::{FusedHit, FusedResult, FusionConfig, HybridOutcome, fuse, hybrid_search};
pub use gateway::{Backend, ElasticGateway, Retrieval, RetrievalGateway};
pub use service::{DocumentView, lookup_document, run_search};
