// =============================================================================
// Conditional Volatility — is volatility flow-dependent?
// =============================================================================
//
// Groups realized 7-day volatility by intent signal and by flow intensity
// (upper-quartile inflow/outflow days), and correlates raw flows against
// volatility. Answers: do high inflows coincide with rougher markets, and is
// selling pressure more volatile than accumulation?
// =============================================================================

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::engine::IntentPoint;
use crate::series::rolling::pearson;
use crate::types::{DailyRecord, IntentSignal};

/// Minimum complete rows before the report is attempted.
const MIN_ROWS: usize = 10;

/// Quantile defining a "high" flow day.
const INTENSITY_QUANTILE: f64 = 0.75;

#[derive(Debug, Clone, Serialize)]
pub struct GroupStats {
    pub count: usize,
    pub avg_volatility: f64,
    pub avg_return: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlowCorrelations {
    pub inflow_to_volatility: Option<f64>,
    pub outflow_to_volatility: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VolatilityFindings {
    pub high_inflow_increases_volatility: bool,
    pub selling_pressure_more_volatile: bool,
    pub inflow_bearish_confirmed: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VolatilityReport {
    InsufficientData {
        rows: usize,
        required: usize,
    },
    Ok {
        sample_size: usize,
        volatility_by_signal: BTreeMap<String, GroupStats>,
        volatility_by_flow_intensity: BTreeMap<String, GroupStats>,
        correlations: FlowCorrelations,
        key_findings: VolatilityFindings,
    },
}

struct Row {
    inflow: f64,
    outflow: f64,
    volatility: f64,
    ret: f64,
    signal: IntentSignal,
}

/// Build the conditional-volatility report over the full history.
pub fn analyze(records: &[DailyRecord], intent: &[IntentPoint]) -> VolatilityReport {
    let rows: Vec<Row> = records
        .iter()
        .enumerate()
        .filter_map(|(i, r)| match (r.asset_volatility_7d, r.asset_return_1d) {
            (Some(volatility), Some(ret)) => Some(Row {
                inflow: r.exchange_inflow,
                outflow: r.exchange_outflow,
                volatility,
                ret,
                signal: intent[i].signal,
            }),
            _ => None,
        })
        .collect();

    if rows.len() < MIN_ROWS {
        debug!(rows = rows.len(), required = MIN_ROWS, "conditional volatility: not enough rows");
        return VolatilityReport::InsufficientData {
            rows: rows.len(),
            required: MIN_ROWS,
        };
    }

    let mut by_signal = BTreeMap::new();
    for signal in [
        IntentSignal::SellingPressure,
        IntentSignal::Neutral,
        IntentSignal::Accumulation,
    ] {
        let members: Vec<&Row> = rows.iter().filter(|r| r.signal == signal).collect();
        if !members.is_empty() {
            by_signal.insert(signal.to_string(), group_stats(&members));
        }
    }

    let inflow_threshold = quantile(rows.iter().map(|r| r.inflow).collect(), INTENSITY_QUANTILE);
    let outflow_threshold = quantile(rows.iter().map(|r| r.outflow).collect(), INTENSITY_QUANTILE);

    let high_inflow: Vec<&Row> = rows.iter().filter(|r| r.inflow >= inflow_threshold).collect();
    let high_outflow: Vec<&Row> = rows.iter().filter(|r| r.outflow >= outflow_threshold).collect();

    let mut by_intensity = BTreeMap::new();
    if !high_inflow.is_empty() {
        by_intensity.insert("high_inflow".to_string(), group_stats(&high_inflow));
    }
    if !high_outflow.is_empty() {
        by_intensity.insert("high_outflow".to_string(), group_stats(&high_outflow));
    }

    let inflows: Vec<f64> = rows.iter().map(|r| r.inflow).collect();
    let outflows: Vec<f64> = rows.iter().map(|r| r.outflow).collect();
    let vols: Vec<f64> = rows.iter().map(|r| r.volatility).collect();
    let correlations = FlowCorrelations {
        inflow_to_volatility: pearson(&inflows, &vols),
        outflow_to_volatility: pearson(&outflows, &vols),
    };

    let overall_avg_vol = vols.iter().sum::<f64>() / vols.len() as f64;
    let key_findings = VolatilityFindings {
        high_inflow_increases_volatility: by_intensity
            .get("high_inflow")
            .map(|s| s.avg_volatility > overall_avg_vol)
            .unwrap_or(false),
        selling_pressure_more_volatile: match (
            by_signal.get("selling_pressure"),
            by_signal.get("accumulation"),
        ) {
            (Some(sell), Some(acc)) => sell.avg_volatility > acc.avg_volatility,
            _ => false,
        },
        inflow_bearish_confirmed: by_intensity
            .get("high_inflow")
            .map(|s| s.avg_return < 0.0)
            .unwrap_or(false),
    };

    VolatilityReport::Ok {
        sample_size: rows.len(),
        volatility_by_signal: by_signal,
        volatility_by_flow_intensity: by_intensity,
        correlations,
        key_findings,
    }
}

fn group_stats(members: &[&Row]) -> GroupStats {
    let n = members.len() as f64;
    GroupStats {
        count: members.len(),
        avg_volatility: members.iter().map(|r| r.volatility).sum::<f64>() / n,
        avg_return: members.iter().map(|r| r.ret).sum::<f64>() / n,
    }
}

/// Nearest-rank quantile of an unsorted sample.
fn quantile(mut values: Vec<f64>, q: f64) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let idx = ((values.len() as f64 - 1.0) * q).round() as usize;
    values[idx.min(values.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::IndexEngine;
    use crate::engine_config::EngineConfig;
    use crate::testutil::{flow_records, with_prices};

    #[test]
    fn insufficient_rows_is_explicit() {
        let mut records = flow_records(8, |i| (i as f64, i as f64));
        with_prices(&mut records, |i| 100.0 + i as f64);
        let engine = IndexEngine::new(EngineConfig::default());
        let intent = engine.intent(&records);
        match analyze(&records, &intent) {
            VolatilityReport::InsufficientData { required, .. } => assert_eq!(required, 10),
            VolatilityReport::Ok { .. } => panic!("expected insufficient data"),
        }
    }

    #[test]
    fn groups_partition_by_signal_and_thresholds_hold() {
        let n = 150;
        let mut records = flow_records(n, |i| match i % 3 {
            0 => (200.0, 10.0),
            1 => (10.0, 200.0),
            _ => (50.0, 50.0),
        });
        with_prices(&mut records, |i| 300.0 + ((i * 19) % 41) as f64);
        let engine = IndexEngine::new(EngineConfig::default());
        let intent = engine.intent(&records);
        match analyze(&records, &intent) {
            VolatilityReport::Ok {
                sample_size,
                volatility_by_signal,
                volatility_by_flow_intensity,
                ..
            } => {
                let grouped: usize = volatility_by_signal.values().map(|s| s.count).sum();
                assert_eq!(grouped, sample_size);
                // Upper-quartile membership can never exceed roughly half
                // the sample (ties aside it should be near a quarter).
                for stats in volatility_by_flow_intensity.values() {
                    assert!(stats.count <= sample_size);
                    assert!(stats.count > 0);
                }
            }
            VolatilityReport::InsufficientData { .. } => panic!("expected a computed report"),
        }
    }

    #[test]
    fn quantile_nearest_rank() {
        let v = vec![4.0, 1.0, 3.0, 2.0];
        assert_eq!(quantile(v.clone(), 0.0), 1.0);
        assert_eq!(quantile(v.clone(), 1.0), 4.0);
        assert_eq!(quantile(v, 0.75), 3.0);
    }
}
