use crate::server::{self, AppState};
use anyhow::Context;
use clap::Args;
use quill_core::config::QuillConfig;
use quill_search::{Backend, ElasticGateway};
use std::sync::Arc;
use tracing::info;

/// Arguments for `quill serve`.
#[derive(Args, Debug)]
#[command(
    about = "Serve the HTTP JSON API",
    long_about = "Serve the search API over HTTP.\n\n\
                  The backend is pinged once at startup. If it is unreachable the server still starts, \
                  /health reports it and search endpoints answer 503.",
    after_help = "EXAMPLES:\n    # Serve on the configured address\n    quill serve\n\n\
                  # Serve on all interfaces\n    quill serve --bind 0.0.0.0:5000"
)]
pub struct ServeArgs {
    /// Listen address (overrides `[server] bind` and `QUILL_BIND`).
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<String>,
}

/// Execute `quill serve`.
///
/// # Errors
///
/// Returns an error if the runtime cannot start or the address cannot be bound.
pub fn run_serve(args: &ServeArgs, config: &QuillConfig) -> anyhow::Result<()> {
    let bind = args.bind.as_deref().unwrap_or(&config.server.bind);
    info!(backend = %config.backend.url, "connecting to search backend");

    let gateway = ElasticGateway::new(&config.backend, config.query.clone());
    let backend = Backend::connect(Arc::new(gateway));
    let state = AppState::new(backend, config);

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?
        .block_on(server::serve(state, bind))
}
