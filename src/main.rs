// =============================================================================
// WAI Backend — Main Entry Point
// =============================================================================
//
// Whale-activity analytics service: fetches the daily whale metrics and
// trailing prices on every request, computes the activity and intent indices,
// and serves them plus the research reports over a read-only REST API.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod analysis;
mod api;
mod app_state;
mod engine;
mod engine_config;
mod feed;
mod series;
mod types;

#[cfg(test)]
mod testutil;

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::engine_config::EngineConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path =
        std::env::var("WAI_CONFIG_PATH").unwrap_or_else(|_| "engine_config.json".into());
    let mut config = EngineConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        EngineConfig::default()
    });
    config.apply_env_overrides();

    info!(
        baseline = %config.baseline_method,
        baseline_window = config.baseline_window,
        rescale_window = config.rescale_window,
        metrics_url = %config.metrics_url,
        "Engine configured"
    );

    // ── 2. Shared state ──────────────────────────────────────────────────
    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(config)?);

    // ── 3. Serve ─────────────────────────────────────────────────────────
    let app = api::rest::router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "API server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
