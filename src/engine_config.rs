// =============================================================================
// Engine Configuration — immutable calculation parameters
// =============================================================================
//
// Every tunable of the index engine lives here and is passed into the
// calculators at construction; there is no ambient global state, so tests can
// exercise several configurations side by side.
//
// All fields carry `#[serde(default = "...")]` so that adding new fields
// never breaks loading an older config file. Feed URLs and the bind address
// can additionally be overridden from the environment (see `main.rs`).
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::series::baseline::BaselineMethod;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_baseline_window() -> usize {
    30
}

fn default_rescale_window() -> usize {
    180
}

fn default_smoothing_span() -> usize {
    3
}

fn default_momentum_window() -> usize {
    7
}

fn default_confidence_rank_window() -> usize {
    90
}

fn default_confidence_median_window() -> usize {
    30
}

fn default_index_min() -> i64 {
    0
}

fn default_index_max() -> i64 {
    100
}

fn default_metrics_url() -> String {
    "https://raw.githubusercontent.com/Whale-Activity-Analysis/wai-collector/refs/heads/main/data/daily_metrics.json".to_string()
}

fn default_price_url() -> String {
    "https://api.coingecko.com/api/v3/coins/bitcoin/market_chart".to_string()
}

fn default_price_days() -> u32 {
    180
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

// =============================================================================
// EngineConfig
// =============================================================================

/// Immutable configuration for the whole backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Rolling reference used to normalize raw metrics.
    #[serde(default)]
    pub baseline_method: BaselineMethod,

    /// Window (or EWMA span) for the baseline and the adaptive weights.
    #[serde(default = "default_baseline_window")]
    pub baseline_window: usize,

    /// Trailing reference length for percentile rescaling to [0, 100].
    #[serde(default = "default_rescale_window")]
    pub rescale_window: usize,

    /// EMA span for smoothing the activity index. The intent index is
    /// deliberately left unsmoothed so it reacts faster.
    #[serde(default = "default_smoothing_span")]
    pub smoothing_span: usize,

    /// Window for index momentum (index minus its rolling mean).
    #[serde(default = "default_momentum_window")]
    pub momentum_window: usize,

    /// Percentile-rank window for the confidence score components.
    #[serde(default = "default_confidence_rank_window")]
    pub confidence_rank_window: usize,

    /// Median window for the confidence stability term.
    #[serde(default = "default_confidence_median_window")]
    pub confidence_median_window: usize,

    /// Clamp bounds for all computed indices.
    #[serde(default = "default_index_min")]
    pub index_min: i64,
    #[serde(default = "default_index_max")]
    pub index_max: i64,

    /// Primary feed: daily whale metrics document. A failed fetch here is
    /// fatal for the request.
    #[serde(default = "default_metrics_url")]
    pub metrics_url: String,

    /// Secondary feed: trailing close prices. A failed fetch degrades
    /// gracefully — price-dependent fields become absent.
    #[serde(default = "default_price_url")]
    pub price_url: String,

    /// Trailing window requested from the price feed, in days.
    #[serde(default = "default_price_days")]
    pub price_days: u32,

    /// Per-request timeout for both feeds, in seconds. No retries.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Address the HTTP server binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        serde_json::from_str("{}").expect("empty config deserializes via defaults")
    }
}

impl EngineConfig {
    /// Load the configuration from a JSON file. Missing fields fall back to
    /// their defaults; a missing file is the caller's decision to handle.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        info!(path = %path.display(), baseline = %config.baseline_method, "Loaded engine config");
        Ok(config)
    }

    /// Apply environment overrides for deployment-specific values.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("WAI_DATA_URL") {
            self.metrics_url = url;
        }
        if let Ok(url) = std::env::var("WAI_PRICE_URL") {
            self.price_url = url;
        }
        if let Ok(addr) = std::env::var("WAI_BIND_ADDR") {
            self.bind_addr = addr;
        }
    }
}
