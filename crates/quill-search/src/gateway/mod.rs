//! Retrieval Gateway: the seam between quill and the external search engine.
//!
//! The fusion engine only needs ranked lists; everything engine specific
//! (request bodies, transport, response decoding) lives behind
//! [`RetrievalGateway`]. [`ElasticGateway`] talks to an Elasticsearch
//! compatible `_search` API.

mod elastic;

pub use elastic::{ElasticGateway, parse_documents, parse_search_response};

use crate::query::QueryParams;
use quill_core::SearchError;
use quill_core::model::{ContextLine, LineDocument, PlayFacet, RankedList, RetrievalSource};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// One retrieval call's output.
#[derive(Debug, Clone, PartialEq)]
pub struct Retrieval {
    pub list: RankedList,
    /// Total matches reported by the engine, not just this page.
    pub total: u64,
    /// Matches per play.
    pub facets: Vec<PlayFacet>,
    /// Request body sent to the engine.
    pub query: serde_json::Value,
}

impl Retrieval {
    /// An empty retrieval for `source`.
    #[must_use]
    pub const fn empty(source: RetrievalSource) -> Self {
        Self {
            list: RankedList::empty(source),
            total: 0,
            facets: Vec::new(),
            query: serde_json::Value::Null,
        }
    }
}

/// Operations quill needs from a search engine.
pub trait RetrievalGateway: Send + Sync {
    /// Run one ranked retrieval of kind `source`.
    ///
    /// # Errors
    ///
    /// [`SearchError::IndexUnavailable`] when the index backing `source` does
    /// not exist, [`SearchError::BackendUnavailable`] on transport failure.
    fn search(
        &self,
        source: RetrievalSource,
        params: &QueryParams<'_>,
    ) -> Result<Retrieval, SearchError>;

    /// Fetch one document by line id.
    ///
    /// # Errors
    ///
    /// [`SearchError::NotFound`] when no document has `line_id`.
    fn get_document(&self, line_id: u64) -> Result<LineDocument, SearchError>;

    /// Lines of `play_name` within `window` of `line_id`, ascending.
    ///
    /// # Errors
    ///
    /// Transport or decode failures.
    fn get_context(
        &self,
        play_name: &str,
        line_id: u64,
        window: u64,
    ) -> Result<Vec<ContextLine>, SearchError>;

    /// Check the engine is reachable.
    ///
    /// # Errors
    ///
    /// [`SearchError::BackendUnavailable`] when it is not.
    fn ping(&self) -> Result<(), SearchError>;

    /// Top `depth` lexical hits for `query`.
    ///
    /// # Errors
    ///
    /// As [`RetrievalGateway::search`].
    fn retrieve_lexical(
        &self,
        query: &str,
        filters: &[String],
        depth: usize,
    ) -> Result<Retrieval, SearchError> {
        self.search(
            RetrievalSource::Lexical,
            &QueryParams::new(query, filters, 0, depth),
        )
    }

    /// Top `depth` dense-semantic hits for `query`.
    ///
    /// # Errors
    ///
    /// As [`RetrievalGateway::search`]; `IndexUnavailable` when the semantic
    /// index is missing.
    fn retrieve_semantic_dense(
        &self,
        query: &str,
        filters: &[String],
        depth: usize,
    ) -> Result<Retrieval, SearchError> {
        self.search(
            RetrievalSource::DenseSemantic,
            &QueryParams::new(query, filters, 0, depth),
        )
    }
}

/// The search engine capability as seen by request handlers.
///
/// Built once at startup; an unreachable engine yields `Unavailable` so the
/// process keeps serving and each request reports the outage.
#[derive(Clone)]
pub enum Backend {
    Available(Arc<dyn RetrievalGateway>),
    Unavailable { reason: String },
}

impl Backend {
    /// Ping `gateway` and wrap it, soft-failing to `Unavailable`.
    pub fn connect(gateway: Arc<dyn RetrievalGateway>) -> Self {
        match gateway.ping() {
            Ok(()) => {
                info!("search backend reachable");
                Self::Available(gateway)
            }
            Err(err) => {
                warn!("search backend unreachable at startup; search endpoints disabled: {err}");
                let reason = match err {
                    SearchError::BackendUnavailable(reason) => reason,
                    other => other.to_string(),
                };
                Self::Unavailable { reason }
            }
        }
    }

    /// The gateway, or `BackendUnavailable` with the startup reason.
    ///
    /// # Errors
    ///
    /// [`SearchError::BackendUnavailable`] in the `Unavailable` state.
    pub fn gateway(&self) -> Result<&dyn RetrievalGateway, SearchError> {
        match self {
            Self::Available(gateway) => Ok(gateway.as_ref()),
            Self::Unavailable { reason } => Err(SearchError::BackendUnavailable(reason.clone())),
        }
    }

    #[must_use]
    pub const fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available(_) => f.write_str("Backend::Available"),
            Self::Unavailable { reason } => {
                f.debug_struct("Backend::Unavailable").field("reason", reason).finish()
            }
        }
    }
}
