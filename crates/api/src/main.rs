//! PriceSync - catalog price synchronization service
//!
//! Main entry point for the HTTP server.

use std::sync::Arc;

use pricesync_api::{build_router, AppState};
use pricesync_core::{PromotionService, SyncService};
use pricesync_infra::MindboxClient;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load environment variables from a .env file when present
    match dotenvy::dotenv() {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(err) => tracing::debug!(error = %err, "no .env file loaded"),
    }

    let config = pricesync_infra::config::load()?;

    let client = Arc::new(MindboxClient::new(&config.provider)?);
    let sync = Arc::new(SyncService::new(config.worker.clone(), client.clone()));
    let promotions = Arc::new(PromotionService::new(client));

    let state = AppState::new(sync, promotions, config.worker);
    let router = build_router(state);

    let addr = format!("{}:{}", config.server.address, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "starting server");
    axum::serve(listener, router).await?;

    Ok(())
}
