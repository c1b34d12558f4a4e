use std::fmt;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    InvalidFusionConfig,
    DocumentNotFound,
    BackendUnavailable,
    SemanticIndexMissing,
    BackendRejected,
    MalformedResponse,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::InvalidFusionConfig => "E1002",
            Self::DocumentNotFound => "E2001",
            Self::BackendUnavailable => "E6001",
            Self::SemanticIndexMissing => "E6002",
            Self::BackendRejected => "E6003",
            Self::MalformedResponse => "E6004",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::InvalidFusionConfig => "Invalid fusion parameters",
            Self::DocumentNotFound => "Document not found",
            Self::BackendUnavailable => "Search backend unavailable",
            Self::SemanticIndexMissing => "Semantic index missing",
            Self::BackendRejected => "Search backend rejected the request",
            Self::MalformedResponse => "Malformed search backend response",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in quill.toml and retry."),
            Self::InvalidFusionConfig => {
                Some("Use a positive rank constant, candidate depth and page size.")
            }
            Self::DocumentNotFound => None,
            Self::BackendUnavailable => {
                Some("Check [backend] url/api_key or QUILL_BACKEND_URL and that the cluster is up.")
            }
            Self::SemanticIndexMissing => {
                Some("Provision the semantic index before using semantic search modes.")
            }
            Self::BackendRejected => Some("Inspect the query_debug body against the index mapping."),
            Self::MalformedResponse => Some("Verify the backend speaks the Elasticsearch _search API."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Failures surfaced by retrieval and fusion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    /// The search service could not be reached at all.
    #[error("search backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The index backing a retrieval mode does not exist.
    #[error("index unavailable: {0}")]
    IndexUnavailable(String),

    /// Fusion or paging parameters out of range.
    #[error("invalid fusion config: {0}")]
    InvalidConfig(String),

    /// No document carries the requested line id.
    #[error("document {0} not found")]
    NotFound(u64),

    /// The backend answered with a non-success status.
    #[error("search backend returned HTTP {status}: {message}")]
    Backend { status: u16, message: String },

    /// The backend answered but the body could not be interpreted.
    #[error("failed to decode search backend response: {0}")]
    Decode(String),
}

impl SearchError {
    /// Error code for this failure.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::BackendUnavailable(_) => ErrorCode::BackendUnavailable,
            Self::IndexUnavailable(_) => ErrorCode::SemanticIndexMissing,
            Self::InvalidConfig(_) => ErrorCode::InvalidFusionConfig,
            Self::NotFound(_) => ErrorCode::DocumentNotFound,
            Self::Backend { .. } => ErrorCode::BackendRejected,
            Self::Decode(_) => ErrorCode::MalformedResponse,
        }
    }

    /// Remediation hint, falling back to the generic internal hint.
    #[must_use]
    pub fn suggestion(&self) -> String {
        self.error_code()
            .hint()
            .or_else(|| ErrorCode::InternalUnexpected.hint())
            .unwrap_or_default()
            .to_string()
    }

    /// `true` when the failure means the semantic side can be treated as empty.
    #[must_use]
    pub const fn is_index_unavailable(&self) -> bool {
        matches!(self, Self::IndexUnavailable(_))
    }
}
