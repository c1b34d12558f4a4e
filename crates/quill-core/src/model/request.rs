//! Request and response shapes shared by the HTTP API and the CLI.

use super::document::PlayFacet;
use super::hit::Hit;
use crate::error::SearchError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default number of results per page.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Retrieval mode selected by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    Lexical,
    SparseSemantic,
    DenseSemantic,
    Hybrid,
}

impl SearchMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lexical => "lexical",
            Self::SparseSemantic => "sparse",
            Self::DenseSemantic => "dense",
            Self::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "lexical" | "keyword" => Ok(Self::Lexical),
            "sparse" | "sparse-semantic" | "sparse_semantic" | "elser" => Ok(Self::SparseSemantic),
            "dense" | "dense-semantic" | "dense_semantic" | "semantic" => Ok(Self::DenseSemantic),
            "hybrid" | "rrf" => Ok(Self::Hybrid),
            other => Err(format!(
                "unknown search mode '{other}' (expected lexical, sparse, dense or hybrid)"
            )),
        }
    }
}

/// Body accepted by every `/api/search*` endpoint.
///
/// `from` and `size` are signed so that negative values reach validation and
/// come back as [`SearchError::InvalidConfig`] instead of a decode failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub selected_plays: Vec<String>,
    #[serde(default)]
    pub from: i64,
    #[serde(default = "default_size")]
    pub size: i64,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            selected_plays: Vec::new(),
            from: 0,
            size: default_size(),
        }
    }
}

impl SearchRequest {
    /// Convenience constructor for a first page.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    /// Validated `(offset, size)` pair.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidConfig`] when `from` is negative or
    /// `size` is not positive.
    pub fn page(&self) -> Result<(usize, usize), SearchError> {
        let offset = usize::try_from(self.from).map_err(|_| {
            SearchError::InvalidConfig(format!("page offset must be >= 0, got {}", self.from))
        })?;
        let size = usize::try_from(self.size)
            .ok()
            .filter(|size| *size > 0)
            .ok_or_else(|| {
                SearchError::InvalidConfig(format!("page size must be > 0, got {}", self.size))
            })?;
        Ok((offset, size))
    }

    /// Selected plays with blanks removed.
    #[must_use]
    pub fn play_filters(&self) -> Vec<String> {
        self.selected_plays
            .iter()
            .map(|play| play.trim())
            .filter(|play| !play.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[allow(clippy::cast_possible_wrap)]
const fn default_size() -> i64 {
    DEFAULT_PAGE_SIZE as i64
}

/// One result row as rendered to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitView {
    pub play_name: String,
    pub speaker: String,
    pub text_entry: String,
    pub line_id: u64,
    #[serde(rename = "type")]
    pub kind: String,
    pub highlight: Vec<String>,
    /// Fused RRF score (hybrid only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lexical_rank: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_rank: Option<usize>,
}

impl From<&Hit> for HitView {
    fn from(hit: &Hit) -> Self {
        Self {
            play_name: hit.play_name.clone(),
            speaker: hit.speaker.clone(),
            text_entry: hit.text_entry.clone(),
            line_id: hit.line_id,
            kind: hit.kind.clone(),
            highlight: hit.highlight.clone(),
            score: None,
            lexical_rank: None,
            semantic_rank: None,
        }
    }
}

/// Facet block of a response.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Aggregations {
    pub plays: Vec<PlayFacet>,
}

/// Common response envelope for every search mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub total: u64,
    pub hits: Vec<HitView>,
    pub aggregations: Aggregations,
    /// The engine request(s) that produced this response.
    pub query_debug: serde_json::Value,
}
