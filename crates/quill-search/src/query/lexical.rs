//! Boosted phrase/term matching.
//!
//! Three tiers, best first: the exact phrase, the phrase with a bounded word
//! gap, and a fallback that only needs a share of the terms. A `multi_match`
//! phrase clause with a tighter slop sits between the two phrase tiers.

use quill_core::config::QueryConfig;
use serde_json::{Value, json};

/// Scoring clause for lexical search.
#[must_use]
pub fn lexical_clause(query: &str, tuning: &QueryConfig) -> Value {
    let field = tuning.text_field.as_str();

    json!({
        "bool": {
            "should": [
                { "match_phrase": { field: {
                    "query": query,
                    "boost": tuning.exact_phrase_boost,
                } } },
                { "match_phrase": { field: {
                    "query": query,
                    "slop": tuning.sloppy_phrase_slop,
                    "boost": tuning.sloppy_phrase_boost,
                } } },
                { "multi_match": {
                    "query": query,
                    "fields": [field],
                    "type": "phrase",
                    "slop": tuning.partial_phrase_slop,
                    "boost": tuning.partial_phrase_boost,
                } },
                { "match": { field: {
                    "query": query,
                    "operator": "or",
                    "minimum_should_match": tuning.minimum_should_match,
                    "boost": tuning.terms_boost,
                } } },
            ],
            "minimum_should_match": 1,
        }
    })
}
