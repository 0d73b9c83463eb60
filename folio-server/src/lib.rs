mod app;
mod operations;

use anyhow::Result;
use axum::routing::post;

pub use app::{default_config, folio_server, FolioServer};

/// Build the server from defaults overlaid with `FOLIO__*` environment variables.
pub fn build() -> Result<FolioServer> {
    let mut config = default_config();
    config.load_env("FOLIO__");
    build_with(config)
}

pub fn build_with(config: folio_core::FolioConfig) -> Result<FolioServer> {
    let mut server = folio_server(&config)?;

    server.app = server
        .app
        .use_get("/health", || async { "ok" })
        .route("/api/v1/operations/{operation}", post(operations::run_operation));

    Ok(server)
}
