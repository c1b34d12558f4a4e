//! Hybrid search orchestration across the lexical and dense-semantic layers.
//!
//! Both retrievals run concurrently. A failing side degrades to an empty
//! ranking:
//! - a missing semantic index is expected on lexical-only deployments and is
//!   logged at `info`
//! - any other failure is logged at `warn`
//! - the request only fails when both sides fail

use crate::fusion::scoring::{FusedResult, FusionConfig, fuse};
use crate::gateway::{Retrieval, RetrievalGateway};
use quill_core::SearchError;
use quill_core::model::{PlayFacet, RetrievalSource};
use serde_json::{Value, json};
use std::thread;
use tracing::{debug, info, warn};

/// A fused page plus what the caller needs to render it.
#[derive(Debug, Clone, PartialEq)]
pub struct HybridOutcome {
    pub result: FusedResult,
    /// Facets of the lexical retrieval, or the semantic one if lexical failed.
    pub facets: Vec<PlayFacet>,
    /// Both request bodies, the fusion parameters and any degraded sides.
    pub query_debug: Value,
}

/// Run lexical and dense-semantic retrieval for `query` and fuse them with RRF.
///
/// # Errors
///
/// [`SearchError::InvalidConfig`] if `config` is out of range (no retrieval is
/// attempted), or the lexical error when both retrievals fail.
pub fn hybrid_search(
    gateway: &dyn RetrievalGateway,
    query: &str,
    filters: &[String],
    config: &FusionConfig,
) -> Result<HybridOutcome, SearchError> {
    config.validate()?;
    let depth = config.candidate_depth;

    let (lexical, dense) = thread::scope(|scope| {
        let dense = scope.spawn(|| gateway.retrieve_semantic_dense(query, filters, depth));
        let lexical = gateway.retrieve_lexical(query, filters, depth);
        let dense = dense.join().unwrap_or_else(|_| {
            Err(SearchError::BackendUnavailable(
                "semantic retrieval panicked".to_string(),
            ))
        });
        (lexical, dense)
    });

    if let (Err(lexical_err), Err(dense_err)) = (&lexical, &dense) {
        warn!("lexical and semantic retrieval both failed: {lexical_err}; {dense_err}");
        return Err(lexical_err.clone());
    }

    let mut degraded: Vec<&str> = Vec::new();
    let lexical_ok = lexical.is_ok();

    let lexical = lexical.unwrap_or_else(|err| {
        warn!("lexical retrieval failed, fusing semantic results only: {err}");
        degraded.push(RetrievalSource::Lexical.as_str());
        Retrieval::empty(RetrievalSource::Lexical)
    });

    let dense = dense.unwrap_or_else(|err| {
        if err.is_index_unavailable() {
            info!("semantic index unavailable, falling back to lexical-only fusion: {err}");
        } else {
            warn!("semantic retrieval failed, falling back to lexical-only fusion: {err}");
        }
        degraded.push(RetrievalSource::DenseSemantic.as_str());
        Retrieval::empty(RetrievalSource::DenseSemantic)
    });

    let result = fuse(&lexical.list, Some(&dense.list), config)?;
    debug!(
        lexical = lexical.list.len(),
        semantic = dense.list.len(),
        fused = result.total,
        "hybrid fusion complete"
    );

    let query_debug = json!({
        "lexical": lexical.query,
        "semantic": dense.query,
        "fusion": {
            "method": "rrf",
            "rank_constant": config.rank_constant,
            "candidate_depth": config.candidate_depth,
        },
        "degraded": degraded,
    });

    let facets = if lexical_ok {
        lexical.facets
    } else {
        dense.facets
    };

    Ok(HybridOutcome {
        result,
        facets,
        query_debug,
    })
}
