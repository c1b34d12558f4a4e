#![forbid(unsafe_code)]
//! quill-core library.
//!
//! # Conventions
//!
//! - **Errors**: `SearchError` for retrieval/fusion failures, `anyhow::Result`
//!   for configuration loading.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod config;
pub mod error;
pub mod model;

pub use error::{ErrorCode, SearchError};
