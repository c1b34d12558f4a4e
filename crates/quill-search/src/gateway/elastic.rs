//! Elasticsearch gateway over the blocking `ureq` client.
//!
//! Transport failures become `BackendUnavailable`; a 404 naming
//! `index_not_found_exception` becomes `IndexUnavailable` so callers can
//! degrade a missing semantic index instead of failing.

use super::{Retrieval, RetrievalGateway};
use crate::query::document::{context_query, document_query};
use crate::query::{QueryParams, build_search_body};
use quill_core::SearchError;
use quill_core::config::{BackendConfig, QueryConfig};
use quill_core::model::{ContextLine, Hit, LineDocument, PlayFacet, RankedList, RetrievalSource};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

/// Longest backend error body kept in an error message.
const MAX_ERROR_BODY: usize = 500;

/// Gateway to an Elasticsearch-compatible cluster.
pub struct ElasticGateway {
    agent: ureq::Agent,
    base_url: String,
    api_key: Option<String>,
    lexical_index: String,
    semantic_index: String,
    tuning: QueryConfig,
}

impl ElasticGateway {
    #[must_use]
    pub fn new(backend: &BackendConfig, tuning: QueryConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(backend.timeout_secs))
            .user_agent(concat!("quill/", env!("CARGO_PKG_VERSION")))
            .build();

        Self {
            agent,
            base_url: backend.url.trim_end_matches('/').to_string(),
            api_key: backend.api_key.clone(),
            lexical_index: backend.lexical_index.clone(),
            semantic_index: backend.semantic_index.clone(),
            tuning,
        }
    }

    fn index_for(&self, source: RetrievalSource) -> &str {
        match source {
            RetrievalSource::Lexical => &self.lexical_index,
            RetrievalSource::SparseSemantic | RetrievalSource::DenseSemantic => {
                &self.semantic_index
            }
        }
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        let request = self
            .agent
            .request(method, &format!("{}{path}", self.base_url));
        match &self.api_key {
            Some(key) => request.set("Authorization", &format!("ApiKey {key}")),
            None => request,
        }
    }

    fn post_search(&self, index: &str, body: &Value) -> Result<Value, SearchError> {
        debug!(index, "sending _search request");
        let response = self
            .request("POST", &format!("/{index}/_search"))
            .send_json(body)
            .map_err(|err| map_transport_error(index, err))?;

        response
            .into_json::<Value>()
            .map_err(|err| SearchError::Decode(err.to_string()))
    }
}

impl RetrievalGateway for ElasticGateway {
    #[instrument(skip(self, params), fields(query = params.query, limit = params.limit))]
    fn search(
        &self,
        source: RetrievalSource,
        params: &QueryParams<'_>,
    ) -> Result<Retrieval, SearchError> {
        let body = build_search_body(source, params, &self.tuning);
        let response = self.post_search(self.index_for(source), &body)?;
        let mut retrieval = parse_search_response(source, response, &self.tuning.text_field)?;
        retrieval.query = body;
        debug!(
            hits = retrieval.list.len(),
            total = retrieval.total,
            "retrieval complete"
        );
        Ok(retrieval)
    }

    fn get_document(&self, line_id: u64) -> Result<LineDocument, SearchError> {
        let response = self.post_search(&self.lexical_index, &document_query(line_id))?;
        parse_documents(response)?
            .into_iter()
            .next()
            .ok_or(SearchError::NotFound(line_id))
    }

    fn get_context(
        &self,
        play_name: &str,
        line_id: u64,
        window: u64,
    ) -> Result<Vec<ContextLine>, SearchError> {
        let response = self.post_search(
            &self.lexical_index,
            &context_query(play_name, line_id, window),
        )?;
        Ok(parse_documents(response)?
            .into_iter()
            .map(|document| ContextLine {
                is_current: document.line_id == line_id,
                document,
            })
            .collect())
    }

    fn ping(&self) -> Result<(), SearchError> {
        self.request("HEAD", "/")
            .call()
            .map(|_| ())
            .map_err(|err| SearchError::BackendUnavailable(err.to_string()))
    }
}

fn map_transport_error(index: &str, err: ureq::Error) -> SearchError {
    match err {
        ureq::Error::Status(status, response) => {
            let body = response.into_string().unwrap_or_default();
            classify_status(index, status, &body)
        }
        ureq::Error::Transport(transport) => SearchError::BackendUnavailable(transport.to_string()),
    }
}

/// Map a non-success HTTP status to a [`SearchError`].
pub(crate) fn classify_status(index: &str, status: u16, body: &str) -> SearchError {
    if status == 404 && body.contains("index_not_found_exception") {
        return SearchError::IndexUnavailable(index.to_string());
    }

    SearchError::Backend {
        status,
        message: error_reason(body),
    }
}

fn error_reason(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/reason")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.chars().take(MAX_ERROR_BODY).collect())
}

// ---------------------------------------------------------------------------
// Response decoding
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchBody {
    hits: HitsEnvelope,
    #[serde(default)]
    aggregations: Option<AggregationsBody>,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    #[serde(default)]
    total: Option<TotalHits>,
    #[serde(default)]
    hits: Vec<RawHit>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TotalHits {
    Object { value: u64 },
    Count(u64),
}

#[derive(Debug, Deserialize)]
struct RawHit {
    #[serde(rename = "_score", default)]
    score: Option<f64>,
    #[serde(rename = "_source", default)]
    source: LineDocument,
    #[serde(default)]
    highlight: HashMap<String, Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct AggregationsBody {
    #[serde(default)]
    plays: Option<TermsAggregation>,
}

#[derive(Debug, Deserialize)]
struct TermsAggregation {
    #[serde(default)]
    buckets: Vec<Bucket>,
}

#[derive(Debug, Deserialize)]
struct Bucket {
    key: String,
    doc_count: u64,
}

/// Decode a `_search` response into a ranked retrieval.
///
/// Hits keep engine order. Highlights come from `text_field`, falling back to
/// the raw text when the engine returned none. The `query` field is left
/// `Null` for the caller to fill.
///
/// # Errors
///
/// [`SearchError::Decode`] when the body is not a `_search` response.
pub fn parse_search_response(
    source: RetrievalSource,
    body: Value,
    text_field: &str,
) -> Result<Retrieval, SearchError> {
    let parsed: SearchBody =
        serde_json::from_value(body).map_err(|err| SearchError::Decode(err.to_string()))?;

    let total = match parsed.hits.total {
        Some(TotalHits::Object { value } | TotalHits::Count(value)) => value,
        None => parsed.hits.hits.len() as u64,
    };

    let hits = parsed
        .hits
        .hits
        .into_iter()
        .enumerate()
        .map(|(idx, mut raw)| {
            let highlight = raw
                .highlight
                .remove(text_field)
                .filter(|fragments| !fragments.is_empty())
                .unwrap_or_else(|| vec![raw.source.text_entry.clone()]);
            Hit {
                line_id: raw.source.line_id,
                rank: idx + 1,
                source_score: raw.score.unwrap_or(0.0),
                play_name: raw.source.play_name,
                speaker: raw.source.speaker,
                text_entry: raw.source.text_entry,
                kind: raw.source.kind,
                highlight,
            }
        })
        .collect();

    let facets = parsed
        .aggregations
        .and_then(|aggs| aggs.plays)
        .map(|plays| {
            plays
                .buckets
                .into_iter()
                .map(|bucket| PlayFacet {
                    name: bucket.key,
                    count: bucket.doc_count,
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(Retrieval {
        list: RankedList::from_hits(source, hits),
        total,
        facets,
        query: Value::Null,
    })
}

/// Decode the `_source` of every hit in a `_search` response.
///
/// # Errors
///
/// [`SearchError::Decode`] when the body is not a `_search` response.
pub fn parse_documents(body: Value) -> Result<Vec<LineDocument>, SearchError> {
    let parsed: SearchBody =
        serde_json::from_value(body).map_err(|err| SearchError::Decode(err.to_string()))?;
    Ok(parsed.hits.hits.into_iter().map(|raw| raw.source).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_response() -> Value {
        json!({
            "took": 3,
            "hits": {
                "total": { "value": 2, "relation": "eq" },
                "hits": [
                    {
                        "_score": 12.5,
                        "_source": {
                            "type": "line",
                            "line_id": 34229,
                            "play_name": "Hamlet",
                            "speaker": "HAMLET",
                            "text_entry": "To be, or not to be: that is the question:"
                        },
                        "highlight": {
                            "text_entry": ["<mark>To be</mark>, or not <mark>to be</mark>"]
                        }
                    },
                    {
                        "_score": 3.0,
                        "_source": {
                            "type": "line",
                            "line_id": 107_000,
                            "play_name": "Twelfth Night",
                            "speaker": "MALVOLIO",
                            "text_entry": "Be not afraid of greatness"
                        }
                    }
                ]
            },
            "aggregations": {
                "plays": {
                    "buckets": [
                        { "key": "Hamlet", "doc_count": 1 },
                        { "key": "Twelfth Night", "doc_count": 1 }
                    ]
                }
            }
        })
    }

    #[test]
    fn parses_hits_in_engine_order() {
        let retrieval =
            parse_search_response(RetrievalSource::Lexical, sample_response(), "text_entry")
                .expect("parse");

        assert_eq!(retrieval.total, 2);
        let hits = retrieval.list.hits();
        assert_eq!(hits[0].line_id, 34229);
        assert_eq!(hits[0].rank, 1);
        assert!((hits[0].source_score - 12.5).abs() < f64::EPSILON);
        assert_eq!(hits[1].speaker, "MALVOLIO");
        assert_eq!(hits[1].rank, 2);
    }

    #[test]
    fn highlight_falls_back_to_text() {
        let retrieval =
            parse_search_response(RetrievalSource::Lexical, sample_response(), "text_entry")
                .expect("parse");
        let hits = retrieval.list.hits();

        assert!(hits[0].highlight[0].contains("<mark>"));
        assert_eq!(hits[1].highlight, vec!["Be not afraid of greatness"]);
    }

    #[test]
    fn parses_play_facets() {
        let retrieval =
            parse_search_response(RetrievalSource::Lexical, sample_response(), "text_entry")
                .expect("parse");
        assert_eq!(
            retrieval.facets,
            vec![
                PlayFacet {
                    name: "Hamlet".into(),
                    count: 1
                },
                PlayFacet {
                    name: "Twelfth Night".into(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn legacy_numeric_total_and_missing_aggs() {
        let body = json!({ "hits": { "total": 7, "hits": [] } });
        let retrieval =
            parse_search_response(RetrievalSource::DenseSemantic, body, "text_entry").expect("parse");
        assert_eq!(retrieval.total, 7);
        assert!(retrieval.facets.is_empty());
        assert!(retrieval.list.is_empty());
    }

    #[test]
    fn non_search_body_is_decode_error() {
        let err = parse_search_response(
            RetrievalSource::Lexical,
            json!({ "acknowledged": true }),
            "text_entry",
        )
        .expect_err("must fail");
        assert!(matches!(err, SearchError::Decode(_)));
    }

    #[test]
    fn parse_documents_reads_sources() {
        let docs = parse_documents(sample_response()).expect("parse");
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].play_name, "Hamlet");
        assert_eq!(docs[0].kind, "line");
    }

    #[test]
    fn act_header_with_blank_speech_number_decodes() {
        let body = json!({
            "hits": {
                "total": { "value": 1, "relation": "eq" },
                "hits": [{
                    "_source": {
                        "type": "act",
                        "line_id": 1,
                        "play_name": "Henry IV",
                        "speech_number": "",
                        "line_number": "",
                        "speaker": "",
                        "text_entry": "ACT I"
                    }
                }]
            }
        });

        let docs = parse_documents(body).expect("act header decodes");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].kind, "act");
        assert_eq!(docs[0].speech_number, None);
        assert_eq!(docs[0].text_entry, "ACT I");
    }

    #[test]
    fn missing_index_is_index_unavailable() {
        let body = r#"{"error":{"type":"index_not_found_exception","reason":"no such index [shakespeare-semantic]"},"status":404}"#;
        assert_eq!(
            classify_status("shakespeare-semantic", 404, body),
            SearchError::IndexUnavailable("shakespeare-semantic".into())
        );
    }

    #[test]
    fn other_statuses_carry_reason() {
        let body = r#"{"error":{"type":"parsing_exception","reason":"unknown query [semantic]"},"status":400}"#;
        assert_eq!(
            classify_status("shakespeare", 400, body),
            SearchError::Backend {
                status: 400,
                message: "unknown query [semantic]".into()
            }
        );
    }

    #[test]
    fn plain_text_error_body_is_truncated() {
        let body = "x".repeat(2_000);
        match classify_status("shakespeare", 502, &body) {
            SearchError::Backend { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message.len(), MAX_ERROR_BODY);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn gateway_trims_trailing_slash() {
        let backend = BackendConfig {
            url: "http://localhost:9200/".into(),
            ..BackendConfig::default()
        };
        let gateway = ElasticGateway::new(&backend, QueryConfig::default());
        assert_eq!(gateway.base_url, "http://localhost:9200");
        assert_eq!(gateway.index_for(RetrievalSource::DenseSemantic), "shakespeare-semantic");
        assert_eq!(gateway.index_for(RetrievalSource::Lexical), "shakespeare");
    }
}
