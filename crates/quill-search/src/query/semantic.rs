//! Sparse (learned expansion) and dense (embedding) semantic clauses.
//!
//! Inference runs inside the engine; quill only names the field and, for the
//! sparse model, the inference endpoint.

use quill_core::config::QueryConfig;
use serde_json::{Value, json};

/// `sparse_vector` clause against the expansion field.
#[must_use]
pub fn sparse_clause(query: &str, tuning: &QueryConfig) -> Value {
    json!({
        "sparse_vector": {
            "field": tuning.sparse_field,
            "inference_id": tuning.sparse_inference_id,
            "query": query,
        }
    })
}

/// `semantic` clause against the dense embedding field.
#[must_use]
pub fn dense_clause(query: &str, tuning: &QueryConfig) -> Value {
    json!({
        "semantic": {
            "field": tuning.dense_field,
            "query": query,
        }
    })
}
