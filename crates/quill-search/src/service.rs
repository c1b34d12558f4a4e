//! Request-level search operations shared by the HTTP API and the CLI.

use crate::fusion::{FusionConfig, hybrid_search};
use crate::gateway::RetrievalGateway;
use crate::query::QueryParams;
use quill_core::SearchError;
use quill_core::config::FusionSettings;
use quill_core::model::{
    Aggregations, ContextLine, HitView, LineDocument, RetrievalSource, SearchMode, SearchRequest,
    SearchResponse,
};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

/// A document with the lines around it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentView {
    pub document: LineDocument,
    pub context: Vec<ContextLine>,
}

/// Engine retrieval backing a single-mode search, `None` for hybrid.
#[must_use]
pub const fn single_source(mode: SearchMode) -> Option<RetrievalSource> {
    match mode {
        SearchMode::Lexical => Some(RetrievalSource::Lexical),
        SearchMode::SparseSemantic => Some(RetrievalSource::SparseSemantic),
        SearchMode::DenseSemantic => Some(RetrievalSource::DenseSemantic),
        SearchMode::Hybrid => None,
    }
}

/// Run one search request in `mode`.
///
/// Single-mode searches page inside the engine. Hybrid search fuses the top
/// `settings.candidate_depth` hits of both sides and pages the fused order.
///
/// # Errors
///
/// [`SearchError::InvalidConfig`] for a negative offset, a non-positive size
/// or out-of-range fusion settings; otherwise whatever the gateway reports.
#[instrument(skip(gateway, request, settings), fields(query = %request.query))]
pub fn run_search(
    gateway: &dyn RetrievalGateway,
    mode: SearchMode,
    request: &SearchRequest,
    settings: &FusionSettings,
) -> Result<SearchResponse, SearchError> {
    let (offset, size) = request.page()?;
    let filters = request.play_filters();

    let Some(source) = single_source(mode) else {
        let config = FusionConfig::from_settings(settings, offset, size);
        let outcome = hybrid_search(gateway, &request.query, &filters, &config)?;
        return Ok(SearchResponse {
            total: outcome.result.total as u64,
            hits: outcome.result.hits.iter().map(HitView::from).collect(),
            aggregations: Aggregations {
                plays: outcome.facets,
            },
            query_debug: outcome.query_debug,
        });
    };

    let retrieval = gateway.search(
        source,
        &QueryParams::new(&request.query, &filters, offset, size),
    )?;

    Ok(SearchResponse {
        total: retrieval.total,
        hits: retrieval.list.iter().map(HitView::from).collect(),
        aggregations: Aggregations {
            plays: retrieval.facets,
        },
        query_debug: retrieval.query,
    })
}

/// Fetch a document and the lines within `window` of it in the same play.
///
/// A failed context lookup leaves the context empty.
///
/// # Errors
///
/// [`SearchError::NotFound`] when no document has `line_id`, or the gateway
/// error for the document lookup itself.
pub fn lookup_document(
    gateway: &dyn RetrievalGateway,
    line_id: u64,
    window: u64,
) -> Result<DocumentView, SearchError> {
    let document = gateway.get_document(line_id)?;

    let context = if window == 0 {
        Vec::new()
    } else {
        gateway
            .get_context(&document.play_name, line_id, window)
            .unwrap_or_else(|err| {
                warn!(line_id, "context lookup failed, returning document alone: {err}");
                Vec::new()
            })
    };

    Ok(DocumentView { document, context })
}
