use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use quill_core::{ErrorCode, SearchError};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, warn};

/// Errors emitted by the HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend was unreachable at startup; every request is refused.
    #[error("search backend unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Search(#[from] SearchError),
    /// The request body, path or query string could not be decoded.
    #[error("malformed request: {0}")]
    BadRequest(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("internal handler error: {0}")]
    Internal(String),
}

impl ApiError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Search(SearchError::InvalidConfig(_)) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Search(SearchError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Search(_) | Self::Timeout(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Unavailable(_) | Self::Search(SearchError::BackendUnavailable(_)) => {
                "backend_unavailable"
            }
            Self::Search(SearchError::IndexUnavailable(_)) => "index_unavailable",
            Self::Search(SearchError::InvalidConfig(_)) | Self::BadRequest(_) => "invalid_request",
            Self::Search(SearchError::NotFound(_)) => "not_found",
            Self::Search(SearchError::Backend { .. }) => "backend_rejected",
            Self::Search(SearchError::Decode(_)) => "malformed_response",
            Self::Timeout(_) => "timeout",
            Self::Internal(_) => "internal",
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => ErrorCode::BackendUnavailable.code(),
            Self::Search(err) => err.error_code().code(),
            Self::BadRequest(_) => ErrorCode::InvalidFusionConfig.code(),
            Self::Timeout(_) | Self::Internal(_) => {
                ErrorCode::InternalUnexpected.code()
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(kind = self.kind(), "request failed: {self}");
        } else {
            warn!(kind = self.kind(), "request rejected: {self}");
        }

        let payload = json!({
            "error": self.to_string(),
            "kind": self.kind(),
            "code": self.code(),
        });
        (status, Json(payload)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let cases = [
            (
                ApiError::Unavailable("connection refused".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ApiError::from(SearchError::BackendUnavailable("connection reset".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ApiError::BadRequest("expected value".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::from(SearchError::InvalidConfig("size".into())),
                StatusCode::BAD_REQUEST,
            ),
            (ApiError::from(SearchError::NotFound(3)), StatusCode::NOT_FOUND),
            (
                ApiError::from(SearchError::IndexUnavailable("shakespeare-semantic".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ApiError::Timeout(Duration::from_secs(30)),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.status(), expected, "{err}");
        }
    }

    #[test]
    fn codes_follow_search_errors() {
        assert_eq!(ApiError::from(SearchError::NotFound(1)).code(), "E2001");
        assert_eq!(ApiError::Internal("boom".into()).code(), "E9001");
        assert_eq!(ApiError::Unavailable("down".into()).code(), "E6001");
    }

    #[test]
    fn search_errors_keep_their_message() {
        let err = ApiError::from(SearchError::NotFound(12));
        assert_eq!(err.to_string(), "document 12 not found");
    }
}
