//! HTTP JSON API over the search service.
//!
//! Handlers run the blocking gateway on tokio's blocking pool; see
//! [`state::AppState::run_blocking`].

pub mod error;
pub mod routes;
pub mod state;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

pub use routes::build_router;
pub use state::AppState;

/// Bind `addr` and serve until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(state: AppState, addr: &str) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %listener.local_addr()?, "quill API listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}
