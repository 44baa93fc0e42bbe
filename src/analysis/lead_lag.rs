// =============================================================================
// Lead-Lag Analyzer — do prices follow whale flows?
// =============================================================================
//
// For each candidate predictor (exchange inflow, outflow, netflow, intent
// index, activity index) and each lag k in 0..=max_lag, correlate
// predictor[0 .. n-k) against forward returns[k .. n) over the complete
// aligned rows. The lag with maximal |correlation| wins per predictor.
//
// With fewer than `max_lag + 10` aligned rows the analysis reports
// insufficient data instead of a spurious correlation.
// =============================================================================

use serde::Serialize;
use tracing::debug;

use crate::engine::{ActivityPoint, IntentPoint};
use crate::series::rolling::pearson;
use crate::types::DailyRecord;

/// Minimum aligned rows beyond the lag range before correlations are trusted.
const MIN_EXTRA_ROWS: usize = 10;

/// Absolute-correlation cutoff for the key-findings booleans.
const SIGNIFICANCE: f64 = 0.10;

#[derive(Debug, Clone, Serialize)]
pub struct LagCorrelation {
    pub lag: usize,
    pub correlation: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictorReport {
    pub predictor: String,
    pub best_lag: usize,
    pub best_correlation: f64,
    pub lags: Vec<LagCorrelation>,
    pub interpretation: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyFindings {
    pub inflow_bearish: bool,
    pub outflow_bullish: bool,
    pub intent_predictive: bool,
    pub best_predictor: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LeadLagReport {
    InsufficientData {
        sample_size: usize,
        required: usize,
    },
    Ok {
        sample_size: usize,
        max_lag_days: usize,
        predictors: Vec<PredictorReport>,
        key_findings: KeyFindings,
    },
}

/// Run the lead-lag analysis over the full history.
pub fn analyze(
    records: &[DailyRecord],
    activity: &[ActivityPoint],
    intent: &[IntentPoint],
    max_lag: usize,
) -> LeadLagReport {
    // Aligned complete rows: every predictor plus a defined 1-day return.
    let mut inflow = Vec::new();
    let mut outflow = Vec::new();
    let mut netflow = Vec::new();
    let mut act = Vec::new();
    let mut int = Vec::new();
    let mut returns = Vec::new();

    for (i, r) in records.iter().enumerate() {
        if let Some(ret) = r.asset_return_1d {
            inflow.push(r.exchange_inflow);
            outflow.push(r.exchange_outflow);
            netflow.push(r.exchange_outflow - r.exchange_inflow);
            act.push(activity[i].index as f64);
            int.push(intent[i].index as f64);
            returns.push(ret);
        }
    }

    let sample_size = returns.len();
    let required = max_lag + MIN_EXTRA_ROWS;
    if sample_size < required {
        debug!(sample_size, required, "lead-lag: not enough aligned rows");
        return LeadLagReport::InsufficientData {
            sample_size,
            required,
        };
    }

    let predictors = vec![
        predictor_report("exchange_inflow", &inflow, &returns, max_lag),
        predictor_report("exchange_outflow", &outflow, &returns, max_lag),
        predictor_report("netflow", &netflow, &returns, max_lag),
        predictor_report("intent_index", &int, &returns, max_lag),
        predictor_report("activity_index", &act, &returns, max_lag),
    ];

    let find = |name: &str| predictors.iter().find(|p| p.predictor == name);
    let inflow_bearish = find("exchange_inflow")
        .map(|p| p.best_correlation < -SIGNIFICANCE)
        .unwrap_or(false);
    let outflow_bullish = find("exchange_outflow")
        .map(|p| p.best_correlation > SIGNIFICANCE)
        .unwrap_or(false);
    let intent_predictive = find("intent_index")
        .map(|p| p.best_correlation.abs() > SIGNIFICANCE)
        .unwrap_or(false);
    let best_predictor = predictors
        .iter()
        .max_by(|a, b| {
            a.best_correlation
                .abs()
                .total_cmp(&b.best_correlation.abs())
        })
        .map(|p| p.predictor.clone())
        .unwrap_or_default();

    LeadLagReport::Ok {
        sample_size,
        max_lag_days: max_lag,
        predictors,
        key_findings: KeyFindings {
            inflow_bearish,
            outflow_bullish,
            intent_predictive,
            best_predictor,
        },
    }
}

fn predictor_report(
    name: &str,
    predictor: &[f64],
    returns: &[f64],
    max_lag: usize,
) -> PredictorReport {
    let n = predictor.len();
    let mut lags = Vec::with_capacity(max_lag + 1);
    for lag in 0..=max_lag {
        if n <= lag + 1 {
            break;
        }
        if let Some(r) = pearson(&predictor[..n - lag], &returns[lag..]) {
            lags.push(LagCorrelation {
                lag,
                correlation: r,
            });
        }
    }

    let best = lags
        .iter()
        .max_by(|a, b| a.correlation.abs().total_cmp(&b.correlation.abs()))
        .cloned();

    let (best_lag, best_correlation) = best
        .map(|l| (l.lag, l.correlation))
        .unwrap_or((0, 0.0));

    let interpretation = interpret(name, best_lag, best_correlation);

    PredictorReport {
        predictor: name.to_string(),
        best_lag,
        best_correlation,
        lags,
        interpretation,
    }
}

fn interpret(name: &str, lag: usize, correlation: f64) -> String {
    if correlation == 0.0 {
        return format!("{name}: no usable correlation with forward returns");
    }
    let direction = if correlation > 0.0 { "higher" } else { "lower" };
    let strength = match correlation.abs() {
        a if a >= 0.3 => "strong",
        a if a >= SIGNIFICANCE => "moderate",
        _ => "weak",
    };
    format!(
        "{name}: {strength} association with {direction} returns {lag} day(s) ahead (r = {correlation:.3})"
    )
}
