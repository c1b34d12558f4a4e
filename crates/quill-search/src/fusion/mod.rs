//! Fusion of lexical and dense-semantic rankings.
//!
//! [`scoring`] holds the pure Reciprocal Rank Fusion engine; [`hybrid`]
//! drives both retrievals against a gateway and degrades a failing side to an
//! empty ranking before fusing.

pub mod hybrid;
pub mod scoring;

pub use hybrid::{HybridOutcome, hybrid_search};
pub use scoring::{
    FusedEntry, FusedHit, FusedResult, FusionConfig, fuse, fused_order, rrf_contribution,
};
