//! HTTP route definitions and handlers.

use crate::server::error::ApiError;
use crate::server::state::AppState;
use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    routing::{get, post},
};
use quill_core::model::{SearchMode, SearchRequest, SearchResponse};
use quill_search::{DocumentView, lookup_document, run_search};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

/// Build the API router over `state`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/search", post(search_lexical))
        .route("/api/search-semantic-sparse", post(search_sparse))
        .route("/api/search-semantic-dense", post(search_dense))
        .route("/api/search-hybrid", post(search_hybrid))
        .route("/document/:line_id", get(document))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// `available` or `unavailable`.
    pub backend: String,
    pub version: String,
    pub uptime: u64,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let backend = if state.backend.is_available() {
        "available"
    } else {
        "unavailable"
    };
    Json(HealthResponse {
        status: "ok".to_string(),
        backend: backend.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime: state.uptime_seconds(),
    })
}

async fn search_lexical(
    State(state): State<AppState>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    search_mode(&state, SearchMode::Lexical, body?).await
}

async fn search_sparse(
    State(state): State<AppState>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    search_mode(&state, SearchMode::SparseSemantic, body?).await
}

async fn search_dense(
    State(state): State<AppState>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    search_mode(&state, SearchMode::DenseSemantic, body?).await
}

async fn search_hybrid(
    State(state): State<AppState>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    search_mode(&state, SearchMode::Hybrid, body?).await
}

async fn search_mode(
    state: &AppState,
    mode: SearchMode,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let settings = state.fusion.clone();
    let response = state
        .run_blocking(move |gateway| run_search(gateway, mode, &request, &settings))
        .await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct DocumentParams {
    context: Option<u64>,
}

async fn document(
    State(state): State<AppState>,
    line_id: Result<Path<u64>, PathRejection>,
    params: Result<Query<DocumentParams>, QueryRejection>,
) -> Result<Json<DocumentView>, ApiError> {
    let Path(line_id) = line_id?;
    let Query(params) = params?;
    let window = params.context.unwrap_or(state.context_window);
    let view = state
        .run_blocking(move |gateway| lookup_document(gateway, line_id, window))
        .await?;
    Ok(Json(view))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use quill_core::SearchError;
    use quill_core::config::QuillConfig;
    use quill_core::model::{ContextLine, Hit, LineDocument, RankedList, RetrievalSource};
    use quill_search::query::QueryParams;
    use quill_search::{Backend, Retrieval, RetrievalGateway};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    /// Lexical ranks 1..=3, dense ranks 2, 4, 1; no semantic index when
    /// `lexical_only` is set.
    struct StubGateway {
        lexical_only: bool,
        delay: Duration,
    }

    impl StubGateway {
        fn backend(lexical_only: bool) -> Backend {
            Backend::Available(Arc::new(Self {
                lexical_only,
                delay: Duration::ZERO,
            }))
        }
    }

    fn hit(line_id: u64) -> Hit {
        Hit {
            line_id,
            rank: 0,
            source_score: 1.0,
            play_name: "Hamlet".into(),
            speaker: "HAMLET".into(),
            text_entry: format!("line {line_id}"),
            kind: "line".into(),
            highlight: vec![format!("<mark>line</mark> {line_id}")],
        }
    }

    impl RetrievalGateway for StubGateway {
        fn search(
            &self,
            source: RetrievalSource,
            params: &QueryParams<'_>,
        ) -> Result<Retrieval, SearchError> {
            std::thread::sleep(self.delay);
            let ids: Vec<u64> = match source {
                RetrievalSource::Lexical => vec![1, 2, 3],
                _ if self.lexical_only => {
                    return Err(SearchError::IndexUnavailable("shakespeare-semantic".into()));
                }
                RetrievalSource::SparseSemantic => vec![3],
                RetrievalSource::DenseSemantic => vec![2, 4, 1],
            };
            let page: Vec<Hit> = ids
                .iter()
                .copied()
                .skip(params.offset)
                .take(params.limit)
                .map(hit)
                .collect();
            Ok(Retrieval {
                list: RankedList::from_hits(source, page),
                total: ids.len() as u64,
                facets: Vec::new(),
                query: json!({ "source": source.as_str(), "filters": params.filters }),
            })
        }

        fn get_document(&self, line_id: u64) -> Result<LineDocument, SearchError> {
            if line_id > 100 {
                return Err(SearchError::NotFound(line_id));
            }
            Ok(LineDocument {
                kind: "line".into(),
                line_id,
                play_name: "Hamlet".into(),
                ..LineDocument::default()
            })
        }

        fn get_context(
            &self,
            _play_name: &str,
            line_id: u64,
            window: u64,
        ) -> Result<Vec<ContextLine>, SearchError> {
            Ok((line_id.saturating_sub(window).max(1)..=line_id + window)
                .map(|id| ContextLine {
                    document: LineDocument {
                        line_id: id,
                        ..LineDocument::default()
                    },
                    is_current: id == line_id,
                })
                .collect())
        }

        fn ping(&self) -> Result<(), SearchError> {
            Ok(())
        }
    }

    /// Reachable at startup, but every search drops the connection.
    struct ResetGateway;

    impl RetrievalGateway for ResetGateway {
        fn search(
            &self,
            _source: RetrievalSource,
            _params: &QueryParams<'_>,
        ) -> Result<Retrieval, SearchError> {
            Err(SearchError::BackendUnavailable("connection reset".into()))
        }

        fn get_document(&self, _line_id: u64) -> Result<LineDocument, SearchError> {
            Err(SearchError::BackendUnavailable("connection reset".into()))
        }

        fn get_context(
            &self,
            _play_name: &str,
            _line_id: u64,
            _window: u64,
        ) -> Result<Vec<ContextLine>, SearchError> {
            Ok(Vec::new())
        }

        fn ping(&self) -> Result<(), SearchError> {
            Ok(())
        }
    }

    fn router(backend: Backend) -> Router {
        build_router(AppState::new(backend, &QuillConfig::default()))
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn line_ids(body: &Value) -> Vec<u64> {
        body["hits"]
            .as_array()
            .unwrap()
            .iter()
            .map(|h| h["line_id"].as_u64().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn health_reports_backend_state() {
        let (status, body) = send(router(StubGateway::backend(false)), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["backend"], "available");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));

        let down = Backend::Unavailable {
            reason: "connection refused".into(),
        };
        let (status, body) = send(router(down), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["backend"], "unavailable");
    }

    #[tokio::test]
    async fn hybrid_returns_fused_order() {
        let (status, body) = send(
            router(StubGateway::backend(false)),
            post_json("/api/search-hybrid", &json!({ "query": "to be" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(line_ids(&body), vec![2, 1, 4, 3]);
        assert_eq!(body["total"], 4);
        assert_eq!(body["hits"][0]["lexical_rank"], 2);
        assert_eq!(body["hits"][0]["semantic_rank"], 1);
        assert_eq!(body["query_debug"]["fusion"]["method"], "rrf");
    }

    #[tokio::test]
    async fn hybrid_without_semantic_index_is_lexical_order() {
        let (status, body) = send(
            router(StubGateway::backend(true)),
            post_json("/api/search-hybrid", &json!({ "query": "to be" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(line_ids(&body), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn single_modes_route_to_their_source() {
        for (uri, source) in [
            ("/api/search", "lexical"),
            ("/api/search-semantic-sparse", "sparse_semantic"),
            ("/api/search-semantic-dense", "dense_semantic"),
        ] {
            let (status, body) = send(
                router(StubGateway::backend(false)),
                post_json(uri, &json!({ "query": "rose", "selected_plays": ["Hamlet"] })),
            )
            .await;
            assert_eq!(status, StatusCode::OK, "{uri}");
            assert_eq!(body["query_debug"]["source"], source);
            assert_eq!(body["query_debug"]["filters"], json!(["Hamlet"]));
            assert!(body["hits"][0].get("score").is_none());
        }
    }

    #[tokio::test]
    async fn unavailable_backend_is_503() {
        let down = Backend::Unavailable {
            reason: "connection refused".into(),
        };
        let (status, body) = send(
            router(down),
            post_json("/api/search-hybrid", &json!({ "query": "love" })),
        )
        .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["kind"], "backend_unavailable");
        assert_eq!(body["code"], "E6001");
        assert!(body["error"].as_str().unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn transport_failure_mid_request_is_500() {
        let backend = Backend::Available(Arc::new(ResetGateway));

        let (status, body) = send(
            router(backend.clone()),
            post_json("/api/search", &json!({ "query": "love" })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["kind"], "backend_unavailable");
        assert!(body["error"].as_str().unwrap().contains("connection reset"));

        let (status, _) = send(
            router(backend.clone()),
            post_json("/api/search-hybrid", &json!({ "query": "love" })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let (status, _) = send(router(backend), get("/document/10")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn malformed_body_gets_error_envelope() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/search")
            .header("content-type", "application/json")
            .body(Body::from("{\"query\": "))
            .unwrap();
        let (status, body) = send(router(StubGateway::backend(false)), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "invalid_request");
        assert_eq!(body["code"], "E1002");
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn wrongly_typed_body_gets_error_envelope() {
        let (status, body) = send(
            router(StubGateway::backend(false)),
            post_json("/api/search", &json!({ "query": "love", "size": "ten" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "invalid_request");
    }

    #[tokio::test]
    async fn non_numeric_line_id_gets_error_envelope() {
        let (status, body) = send(
            router(StubGateway::backend(false)),
            get("/document/hamlet"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "invalid_request");

        let (status, _) = send(
            router(StubGateway::backend(false)),
            get("/document/10?context=wide"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn negative_paging_is_400() {
        let (status, body) = send(
            router(StubGateway::backend(false)),
            post_json("/api/search-hybrid", &json!({ "query": "love", "from": -5 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "invalid_request");

        let (status, _) = send(
            router(StubGateway::backend(false)),
            post_json("/api/search", &json!({ "query": "love", "size": 0 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn dense_on_lexical_only_deployment_is_500() {
        let (status, body) = send(
            router(StubGateway::backend(true)),
            post_json("/api/search-semantic-dense", &json!({ "query": "love" })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["kind"], "index_unavailable");
    }

    #[tokio::test]
    async fn document_with_context() {
        let (status, body) = send(
            router(StubGateway::backend(false)),
            get("/document/10?context=2"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["document"]["line_id"], 10);
        assert_eq!(body["context"].as_array().unwrap().len(), 5);
        assert_eq!(body["context"][2]["is_current"], true);
        assert_eq!(body["context"][2]["line_id"], 10);
    }

    #[tokio::test]
    async fn missing_document_is_404() {
        let (status, body) = send(
            router(StubGateway::backend(false)),
            get("/document/500"),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "document 500 not found");
    }

    #[tokio::test]
    async fn slow_backend_times_out() {
        let backend = Backend::Available(Arc::new(StubGateway {
            lexical_only: false,
            delay: Duration::from_millis(500),
        }));
        let mut state = AppState::new(backend, &QuillConfig::default());
        state.request_timeout = Duration::from_millis(20);

        let (status, body) = send(
            build_router(state),
            post_json("/api/search", &json!({ "query": "love" })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["kind"], "timeout");
    }
}
