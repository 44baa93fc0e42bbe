// =============================================================================
// Upstream Feeds — daily whale metrics + trailing asset prices
// =============================================================================
//
// Two documents per refresh:
//
//   * the daily-metrics JSON (tx count/volume, exchange in/outflows keyed by
//     date) — a failed fetch here is fatal for the request;
//   * a trailing close-price feed in CoinGecko market_chart shape
//     (`{"prices": [[unix_ms, close], ...]}`) — a failed fetch degrades
//     gracefully: price-dependent fields stay `None`.
//
// Returns and 7-day volatility (std/mean of closes) are derived on the
// contiguous price series before merging, so gaps in the metrics feed never
// distort them. No retries, no caching; per-request timeout only.
// =============================================================================

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::engine_config::EngineConfig;
use crate::series::rolling::sample_std;
use crate::types::DailyRecord;

/// Rolling window for derived price volatility, in days.
const VOLATILITY_WINDOW: usize = 7;

#[derive(Debug, Deserialize)]
struct MetricsDocument {
    daily_metrics: Vec<MetricsEntry>,
}

#[derive(Debug, Deserialize)]
struct MetricsEntry {
    date: NaiveDate,
    #[serde(default)]
    whale_tx_count: u64,
    #[serde(default)]
    whale_tx_volume: f64,
    #[serde(default)]
    exchange_inflow: f64,
    #[serde(default)]
    exchange_outflow: f64,
}

#[derive(Debug, Deserialize)]
struct PriceDocument {
    /// `[unix_ms, close]` pairs, ascending.
    prices: Vec<(i64, f64)>,
}

/// Per-date derived price fields, merged into the metrics history.
struct PricePoint {
    close: f64,
    return_1d: Option<f64>,
    volatility_7d: Option<f64>,
}

/// HTTP client for both upstream documents.
#[derive(Debug, Clone)]
pub struct FeedClient {
    metrics_url: String,
    price_url: String,
    price_days: u32,
    client: reqwest::Client,
}

impl FeedClient {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("failed to build feed HTTP client")?;

        Ok(Self {
            metrics_url: config.metrics_url.clone(),
            price_url: config.price_url.clone(),
            price_days: config.price_days,
            client,
        })
    }

    /// Fetch both feeds and return the merged daily history, ascending by
    /// date with duplicates dropped.
    #[instrument(skip(self), name = "feed::fetch_history")]
    pub async fn fetch_history(&self) -> Result<Vec<DailyRecord>> {
        let metrics = self.fetch_metrics().await?;

        // The price feed is best-effort. Without it every index still
        // computes; only the price-conditional reports degrade.
        let prices = match self.fetch_prices().await {
            Ok(p) => p,
            Err(err) => {
                warn!(error = %err, "price feed unavailable, continuing without prices");
                HashMap::new()
            }
        };

        // BTreeMap keyed by date: sorts ascending and drops duplicates in
        // one move (last entry per date wins, matching feed order).
        let mut by_date: BTreeMap<NaiveDate, DailyRecord> = BTreeMap::new();
        for entry in metrics {
            let price = prices.get(&entry.date);
            by_date.insert(
                entry.date,
                DailyRecord {
                    date: entry.date,
                    whale_tx_count: entry.whale_tx_count,
                    whale_tx_volume: entry.whale_tx_volume,
                    exchange_inflow: entry.exchange_inflow,
                    exchange_outflow: entry.exchange_outflow,
                    asset_close: price.map(|p| p.close),
                    asset_return_1d: price.and_then(|p| p.return_1d),
                    asset_volatility_7d: price.and_then(|p| p.volatility_7d),
                },
            );
        }

        let records: Vec<DailyRecord> = by_date.into_values().collect();
        debug!(days = records.len(), "daily history assembled");
        Ok(records)
    }

    async fn fetch_metrics(&self) -> Result<Vec<MetricsEntry>> {
        let resp = self
            .client
            .get(&self.metrics_url)
            .send()
            .await
            .context("daily-metrics request failed")?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("daily-metrics feed returned {status}");
        }

        let doc: MetricsDocument = resp
            .json()
            .await
            .context("failed to parse daily-metrics document")?;

        debug!(entries = doc.daily_metrics.len(), "daily metrics fetched");
        Ok(doc.daily_metrics)
    }

    async fn fetch_prices(&self) -> Result<HashMap<NaiveDate, PricePoint>> {
        let resp = self
            .client
            .get(&self.price_url)
            .query(&[
                ("vs_currency", "usd".to_string()),
                ("days", self.price_days.to_string()),
                ("interval", "daily".to_string()),
            ])
            .send()
            .await
            .context("price feed request failed")?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("price feed returned {status}");
        }

        let doc: PriceDocument = resp.json().await.context("failed to parse price document")?;

        // One close per calendar day, first sample per day wins.
        let mut closes: Vec<(NaiveDate, f64)> = Vec::with_capacity(doc.prices.len());
        for (ms, close) in doc.prices {
            let Some(ts) = DateTime::from_timestamp_millis(ms) else {
                warn!(ms, "skipping price sample with out-of-range timestamp");
                continue;
            };
            let date = ts.date_naive();
            if closes.last().map(|(d, _)| *d) != Some(date) {
                closes.push((date, close));
            }
        }

        debug!(days = closes.len(), "price feed fetched");
        Ok(derive_price_fields(&closes))
    }
}

/// Derive 1-day returns and 7-day volatility over a contiguous close series.
fn derive_price_fields(closes: &[(NaiveDate, f64)]) -> HashMap<NaiveDate, PricePoint> {
    let mut out = HashMap::with_capacity(closes.len());
    for (i, &(date, close)) in closes.iter().enumerate() {
        let return_1d = (i > 0 && closes[i - 1].1 != 0.0)
            .then(|| (close - closes[i - 1].1) / closes[i - 1].1);

        // Undefined until a full window of closes exists.
        let volatility_7d = (i + 1 >= VOLATILITY_WINDOW).then(|| {
            let window: Vec<f64> = closes[i + 1 - VOLATILITY_WINDOW..=i]
                .iter()
                .map(|&(_, c)| c)
                .collect();
            let mean = window.iter().sum::<f64>() / window.len() as f64;
            if mean != 0.0 {
                sample_std(&window) / mean
            } else {
                0.0
            }
        });

        out.insert(
            date,
            PricePoint {
                close,
                return_1d,
                volatility_7d,
            },
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(i: u64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(i)
    }

    #[test]
    fn returns_and_volatility_need_history() {
        let closes: Vec<(NaiveDate, f64)> = (0..10).map(|i| (day(i), 100.0 + i as f64)).collect();
        let derived = derive_price_fields(&closes);

        let first = &derived[&day(0)];
        assert!(first.return_1d.is_none());
        assert!(first.volatility_7d.is_none());

        let second = &derived[&day(1)];
        assert!((second.return_1d.unwrap() - 0.01).abs() < 1e-12);
        assert!(second.volatility_7d.is_none());

        // Day index 6 is the first with seven closes behind it.
        assert!(derived[&day(5)].volatility_7d.is_none());
        assert!(derived[&day(6)].volatility_7d.is_some());
    }

    #[test]
    fn flat_prices_have_zero_volatility_and_return() {
        let closes: Vec<(NaiveDate, f64)> = (0..10).map(|i| (day(i), 250.0)).collect();
        let derived = derive_price_fields(&closes);
        assert_eq!(derived[&day(9)].return_1d, Some(0.0));
        assert_eq!(derived[&day(9)].volatility_7d, Some(0.0));
    }

    #[test]
    fn metrics_document_parses_feed_shape() {
        let raw = r#"{
            "daily_metrics": [
                {"date": "2024-03-01", "whale_tx_count": 120,
                 "whale_tx_volume": 48000.5, "exchange_inflow": 900.0,
                 "exchange_outflow": 1100.0},
                {"date": "2024-03-02", "whale_tx_count": 95}
            ]
        }"#;
        let doc: MetricsDocument = serde_json::from_str(raw).unwrap();
        assert_eq!(doc.daily_metrics.len(), 2);
        assert_eq!(doc.daily_metrics[0].whale_tx_count, 120);
        // Missing flow fields default to zero rather than failing the feed.
        assert_eq!(doc.daily_metrics[1].exchange_inflow, 0.0);
    }

    #[test]
    fn price_document_parses_pair_arrays() {
        let raw = r#"{"prices": [[1709251200000, 62000.5], [1709337600000, 61500.0]]}"#;
        let doc: PriceDocument = serde_json::from_str(raw).unwrap();
        assert_eq!(doc.prices.len(), 2);
        assert_eq!(doc.prices[1].1, 61500.0);
    }
}
