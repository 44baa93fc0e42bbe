// =============================================================================
// Whale Intent Index
// =============================================================================
//
// Direction of whale flows rather than their size:
//
//   netflow        = outflow - inflow          (positive = net withdrawal)
//   netflow_ratio  = netflow / (outflow + inflow), 0 when total flow is 0
//   normalized     = (ratio + 1) / 2           in [0, 1]
//   index          = percentile rescale over 180 days, NO smoothing
//
// The missing smoothing is intentional: intent must react faster than the
// activity index. A day with zero total exchange flow carries no directional
// signal at all, so it is forced to a neutral 50 regardless of what the
// percentile rank would say.
// =============================================================================

use chrono::NaiveDate;
use serde::Serialize;

use crate::engine_config::EngineConfig;
use crate::engine::rescale;
use crate::types::{DailyRecord, IntentSignal};

/// One day of the computed intent index.
#[derive(Debug, Clone, Serialize)]
pub struct IntentPoint {
    pub date: NaiveDate,
    pub index: i64,
    pub signal: IntentSignal,
    pub netflow: f64,
    pub netflow_ratio: f64,
    pub normalized: f64,
    /// True when the day had zero total exchange flow and was forced neutral.
    pub zero_flow: bool,
}

/// Compute the intent index for the full history.
pub fn compute(records: &[DailyRecord], config: &EngineConfig) -> Vec<IntentPoint> {
    let mut netflow = Vec::with_capacity(records.len());
    let mut ratio = Vec::with_capacity(records.len());
    let mut zero_flow = Vec::with_capacity(records.len());

    for r in records {
        let net = r.exchange_outflow - r.exchange_inflow;
        let total = r.exchange_outflow + r.exchange_inflow;
        netflow.push(net);
        if total > 0.0 {
            ratio.push(net / total);
            zero_flow.push(false);
        } else {
            ratio.push(0.0);
            zero_flow.push(true);
        }
    }

    let normalized: Vec<f64> = ratio.iter().map(|r| (r + 1.0) / 2.0).collect();
    let clamp = (config.index_min, config.index_max);
    let index = rescale::rescale(&normalized, config.rescale_window, None, clamp);

    records
        .iter()
        .enumerate()
        .map(|(i, r)| {
            if zero_flow[i] {
                // Flow-free day: neutral override.
                IntentPoint {
                    date: r.date,
                    index: 50,
                    signal: IntentSignal::Neutral,
                    netflow: netflow[i],
                    netflow_ratio: 0.0,
                    normalized: 0.5,
                    zero_flow: true,
                }
            } else {
                IntentPoint {
                    date: r.date,
                    index: index[i],
                    signal: IntentSignal::from_index(index[i]),
                    netflow: netflow[i],
                    netflow_ratio: ratio[i],
                    normalized: normalized[i],
                    zero_flow: false,
                }
            }
        })
        .collect()
}
