//! Single-document and surrounding-context lookups.

use super::{PLAY_FIELD, SOURCE_FIELDS};
use serde_json::{Value, json};

/// Exact lookup of one line id.
#[must_use]
pub fn document_query(line_id: u64) -> Value {
    json!({
        "query": { "term": { "line_id": line_id } },
        "size": 1,
    })
}

/// Lines of `play_name` within `window` of `line_id`, ascending.
///
/// The lower bound never drops below line 1.
#[must_use]
pub fn context_query(play_name: &str, line_id: u64, window: u64) -> Value {
    let lower = line_id.saturating_sub(window).max(1);
    let upper = line_id.saturating_add(window);
    let size = window.saturating_mul(2).saturating_add(1);

    json!({
        "query": {
            "bool": {
                "must": [
                    { "term": { PLAY_FIELD: play_name } },
                    { "range": { "line_id": { "gte": lower, "lte": upper } } },
                ]
            }
        },
        "sort": [{ "line_id": { "order": "asc" } }],
        "size": size,
        "_source": SOURCE_FIELDS,
    })
}
