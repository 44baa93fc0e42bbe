// =============================================================================
// Derived signals — index momentum and confidence score
// =============================================================================

use chrono::NaiveDate;
use serde::Serialize;

use crate::engine_config::EngineConfig;
use crate::series::{or_zero, rolling};
use crate::types::{ConfidenceBand, DailyRecord, MomentumBand};

/// Index momentum: distance of the index from its own 7-day rolling mean.
#[derive(Debug, Clone, Serialize)]
pub struct MomentumPoint {
    pub date: NaiveDate,
    pub momentum: f64,
    pub band: MomentumBand,
}

/// Compute momentum for an already computed index series.
pub fn compute_momentum(
    dates: &[NaiveDate],
    index: &[i64],
    config: &EngineConfig,
) -> Vec<MomentumPoint> {
    let values: Vec<f64> = index.iter().map(|&v| v as f64).collect();
    let mean = rolling::rolling_mean(&values, config.momentum_window);
    dates
        .iter()
        .zip(values.iter().zip(mean.iter()))
        .map(|(&date, (&v, &m))| {
            let momentum = v - m;
            MomentumPoint {
                date,
                momentum,
                band: MomentumBand::from_value(momentum),
            }
        })
        .collect()
}

/// How much the raw inputs themselves can be trusted on a given day.
#[derive(Debug, Clone, Serialize)]
pub struct ConfidencePoint {
    pub date: NaiveDate,
    /// Score in [0, 100], rounded to one decimal.
    pub score: f64,
    pub band: ConfidenceBand,
}

/// Weighted blend of three terms:
///   0.4 × percentile rank of tx count (90-day window)
///   0.3 × percentile rank of total exchange flow (90-day window)
///   0.3 × exp(−|tx − median30(tx)| / median30(tx))   (stability term)
///
/// A zero 30-day median makes the stability term undefined; the policy
/// coerces it to 0.
pub fn compute_confidence(records: &[DailyRecord], config: &EngineConfig) -> Vec<ConfidencePoint> {
    let tx: Vec<f64> = records.iter().map(|r| r.whale_tx_count as f64).collect();
    let flow: Vec<f64> = records
        .iter()
        .map(|r| r.exchange_inflow + r.exchange_outflow)
        .collect();

    let tx_rank = rolling::rolling_percentile_rank(&tx, config.confidence_rank_window);
    let flow_rank = rolling::rolling_percentile_rank(&flow, config.confidence_rank_window);
    let tx_median = rolling::rolling_median(&tx, config.confidence_median_window);

    records
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let stability = if tx_median[i] != 0.0 {
                (-((tx[i] - tx_median[i]).abs() / tx_median[i])).exp()
            } else {
                f64::NAN
            };
            let blend = 0.4 * tx_rank[i] + 0.3 * flow_rank[i] + 0.3 * or_zero(stability);
            let score = (blend * 1000.0).round() / 10.0;
            ConfidencePoint {
                date: r.date,
                score,
                band: ConfidenceBand::from_score(score),
            }
        })
        .collect()
}
