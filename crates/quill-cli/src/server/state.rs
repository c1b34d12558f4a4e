//! Application state shared across all API handlers.

use crate::server::error::ApiError;
use quill_core::SearchError;
use quill_core::config::{FusionSettings, QuillConfig};
use quill_search::{Backend, RetrievalGateway};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
pub struct AppState {
    /// Search engine capability, fixed at startup.
    pub backend: Backend,
    pub fusion: FusionSettings,
    /// Upper bound on one request's backend work.
    pub request_timeout: Duration,
    /// Default `?context=` for `/document/{line_id}`.
    pub context_window: u64,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(backend: Backend, config: &QuillConfig) -> Self {
        Self {
            backend,
            fusion: config.fusion.clone(),
            request_timeout: Duration::from_secs(config.server.request_timeout_secs),
            context_window: config.server.context_window,
            start_time: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Run blocking gateway work off the async runtime, bounded by the
    /// request timeout.
    ///
    /// An unavailable backend is refused before any work is scheduled. On
    /// timeout the caller gets an error immediately; the blocking call
    /// finishes on its own within the gateway's transport timeout.
    pub async fn run_blocking<T, F>(&self, work: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn RetrievalGateway) -> Result<T, SearchError> + Send + 'static,
    {
        let gateway = match &self.backend {
            Backend::Available(gateway) => Arc::clone(gateway),
            Backend::Unavailable { reason } => return Err(ApiError::Unavailable(reason.clone())),
        };
        let task = tokio::task::spawn_blocking(move || work(gateway.as_ref()));

        match tokio::time::timeout(self.request_timeout, task).await {
            Err(_) => Err(ApiError::Timeout(self.request_timeout)),
            Ok(Err(join_err)) => Err(ApiError::Internal(join_err.to_string())),
            Ok(Ok(result)) => result.map_err(ApiError::from),
        }
    }
}
