//! Request bodies for the Elasticsearch `_search` API.
//!
//! Every retrieval mode shares the same envelope: play filter, `plays` facet,
//! highlighting, source filtering and paging. Only the scoring clause
//! differs, see [`lexical`] and [`semantic`]. [`document`] builds the lookup
//! queries behind `/document/{line_id}`.

pub mod document;
pub mod lexical;
pub mod semantic;

use quill_core::config::QueryConfig;
use quill_core::model::RetrievalSource;
use serde_json::{Value, json};

/// Field holding the play name (keyword).
pub const PLAY_FIELD: &str = "play_name";

/// Source fields returned with every hit.
pub const SOURCE_FIELDS: [&str; 5] = ["play_name", "speaker", "text_entry", "line_id", "type"];

/// What to search for and which slice of the ranking to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryParams<'a> {
    pub query: &'a str,
    /// Play names; empty means every play.
    pub filters: &'a [String],
    pub offset: usize,
    pub limit: usize,
}

impl<'a> QueryParams<'a> {
    #[must_use]
    pub const fn new(query: &'a str, filters: &'a [String], offset: usize, limit: usize) -> Self {
        Self {
            query,
            filters,
            offset,
            limit,
        }
    }

    /// `true` when there is no text to score against.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.query.trim().is_empty()
    }
}

/// Full `_search` body for `source`.
#[must_use]
pub fn build_search_body(
    source: RetrievalSource,
    params: &QueryParams<'_>,
    tuning: &QueryConfig,
) -> Value {
    let scoring = if params.is_blank() {
        json!({ "match_all": {} })
    } else {
        match source {
            RetrievalSource::Lexical => lexical::lexical_clause(params.query, tuning),
            RetrievalSource::SparseSemantic => semantic::sparse_clause(params.query, tuning),
            RetrievalSource::DenseSemantic => semantic::dense_clause(params.query, tuning),
        }
    };

    json!({
        "query": with_play_filter(scoring, params.filters),
        "aggs": plays_aggregation(tuning),
        "from": params.offset,
        "size": params.limit,
        "highlight": highlight(tuning),
        "_source": SOURCE_FIELDS,
    })
}

/// Restrict a scoring clause to `filters` without affecting scores.
#[must_use]
pub fn with_play_filter(scoring: Value, filters: &[String]) -> Value {
    if filters.is_empty() {
        return scoring;
    }

    json!({
        "bool": {
            "must": [scoring],
            "filter": [{ "terms": { PLAY_FIELD: filters } }],
        }
    })
}

fn plays_aggregation(tuning: &QueryConfig) -> Value {
    json!({
        "plays": {
            "terms": {
                "field": PLAY_FIELD,
                "size": tuning.facet_size,
                "order": { "_key": "asc" },
            }
        }
    })
}

fn highlight(tuning: &QueryConfig) -> Value {
    let mut fields = serde_json::Map::new();
    fields.insert(
        tuning.text_field.clone(),
        json!({
            "fragment_size": tuning.fragment_size,
            "number_of_fragments": 1,
        }),
    );

    json!({
        "fields": fields,
        "pre_tags": ["<mark>"],
        "post_tags": ["</mark>"],
    })
}
