use std::path::{Path, PathBuf};

use anyhow::Context;
use tokio::net::TcpListener;

use ragdesk_backend::core::config::AppConfig;
use ragdesk_backend::core::logging;
use ragdesk_backend::server::router::router;
use ragdesk_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::var("RAGDESK_CONFIG").ok().map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref())?;

    logging::init(Path::new(&config.server.log_dir));

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::initialize(config)?;

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {bind_addr}"))?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    let app = router(state);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
