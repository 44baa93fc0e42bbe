// =============================================================================
// Regime Classifier — k-means over (activity, intent, volatility)
// =============================================================================
//
// Complete-feature rows are standardized (zero mean, unit variance) and
// partitioned into four clusters by iterative centroid assignment. Cluster
// labels are ephemeral: numbering may permute between calls, so the
// human-readable interpretation is always re-derived from the centroid
// statistics and never compared across calls.
//
// Initialization is data-derived (evenly spaced rows of the activity-sorted
// matrix), which makes a single call reproducible without a random seed.
// =============================================================================

use serde::Serialize;
use tracing::debug;

use crate::engine::{ActivityPoint, IntentPoint};
use crate::types::DailyRecord;

/// Fixed number of clusters.
const N_REGIMES: usize = 4;

/// Minimum complete-feature rows before clustering is attempted.
const MIN_ROWS: usize = 20;

const MAX_ITERATIONS: usize = 100;

/// Thresholds on cluster-mean indices for the interpretation table.
const HIGH: f64 = 65.0;
const LOW: f64 = 35.0;

#[derive(Debug, Clone, Serialize)]
pub struct RegimeCharacteristics {
    pub avg_activity_index: f64,
    pub avg_intent_index: f64,
    pub avg_volatility: f64,
    /// Mean 1-day return over cluster members that have one.
    pub avg_return: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegimeCluster {
    pub regime_id: usize,
    pub count: usize,
    pub percentage: f64,
    pub characteristics: RegimeCharacteristics,
    pub interpretation: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RegimeReport {
    InsufficientData {
        rows: usize,
        required: usize,
    },
    Ok {
        n_regimes: usize,
        total_days: usize,
        latest_date: chrono::NaiveDate,
        regimes: Vec<RegimeCluster>,
        current_regime: RegimeCluster,
    },
}

struct FeatureRow {
    activity: f64,
    intent: f64,
    volatility: f64,
    ret: Option<f64>,
    date: chrono::NaiveDate,
}

/// Cluster the history into market regimes.
pub fn detect(
    records: &[DailyRecord],
    activity: &[ActivityPoint],
    intent: &[IntentPoint],
) -> RegimeReport {
    let rows: Vec<FeatureRow> = records
        .iter()
        .enumerate()
        .filter_map(|(i, r)| {
            r.asset_volatility_7d.map(|vol| FeatureRow {
                activity: activity[i].index as f64,
                intent: intent[i].index as f64,
                volatility: vol,
                ret: r.asset_return_1d,
                date: r.date,
            })
        })
        .collect();

    if rows.len() < MIN_ROWS {
        debug!(rows = rows.len(), required = MIN_ROWS, "regime: not enough complete rows");
        return RegimeReport::InsufficientData {
            rows: rows.len(),
            required: MIN_ROWS,
        };
    }

    // Standardize the three feature columns.
    let matrix: Vec<[f64; 3]> = {
        let cols = [
            rows.iter().map(|r| r.activity).collect::<Vec<_>>(),
            rows.iter().map(|r| r.intent).collect::<Vec<_>>(),
            rows.iter().map(|r| r.volatility).collect::<Vec<_>>(),
        ];
        let stats: Vec<(f64, f64)> = cols.iter().map(|c| mean_std(c)).collect();
        (0..rows.len())
            .map(|i| {
                let mut row = [0.0; 3];
                for (j, col) in cols.iter().enumerate() {
                    let (mean, std) = stats[j];
                    row[j] = if std > 0.0 { (col[i] - mean) / std } else { 0.0 };
                }
                row
            })
            .collect()
    };

    let assignments = kmeans(&matrix, N_REGIMES);

    // Per-cluster statistics on the raw (unstandardized) features.
    let total = rows.len();
    let mut clusters = Vec::with_capacity(N_REGIMES);
    for id in 0..N_REGIMES {
        let members: Vec<&FeatureRow> = rows
            .iter()
            .zip(assignments.iter())
            .filter(|(_, &a)| a == id)
            .map(|(r, _)| r)
            .collect();
        if members.is_empty() {
            continue;
        }
        let count = members.len();
        let avg = |f: fn(&FeatureRow) -> f64| members.iter().map(|r| f(r)).sum::<f64>() / count as f64;
        let returns: Vec<f64> = members.iter().filter_map(|r| r.ret).collect();
        let avg_return = (!returns.is_empty())
            .then(|| returns.iter().sum::<f64>() / returns.len() as f64);

        let characteristics = RegimeCharacteristics {
            avg_activity_index: round2(avg(|r| r.activity)),
            avg_intent_index: round2(avg(|r| r.intent)),
            avg_volatility: avg(|r| r.volatility),
            avg_return,
        };
        let interpretation = interpret(&characteristics, global_mean_volatility(&rows));
        clusters.push(RegimeCluster {
            regime_id: id,
            count,
            percentage: round2(100.0 * count as f64 / total as f64),
            characteristics,
            interpretation,
        });
    }

    let latest_assignment = *assignments.last().expect("rows checked non-empty");
    let current_regime = clusters
        .iter()
        .find(|c| c.regime_id == latest_assignment)
        .cloned()
        .unwrap_or_else(|| clusters[clusters.len() - 1].clone());

    RegimeReport::Ok {
        n_regimes: clusters.len(),
        total_days: total,
        latest_date: rows.last().expect("rows checked non-empty").date,
        regimes: clusters,
        current_regime,
    }
}

// =============================================================================
// K-means
// =============================================================================

fn kmeans(matrix: &[[f64; 3]], k: usize) -> Vec<usize> {
    let n = matrix.len();

    // Deterministic initialization: evenly spaced rows of the matrix ordered
    // by the first (activity) feature.
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| matrix[a][0].total_cmp(&matrix[b][0]));
    let mut centroids: Vec<[f64; 3]> = (0..k)
        .map(|j| matrix[order[j * (n - 1) / (k - 1).max(1)]])
        .collect();

    let mut assignments = vec![0usize; n];
    for _ in 0..MAX_ITERATIONS {
        let mut changed = false;
        for (i, row) in matrix.iter().enumerate() {
            let nearest = centroids
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| distance2(row, a).total_cmp(&distance2(row, b)))
                .map(|(j, _)| j)
                .unwrap_or(0);
            if assignments[i] != nearest {
                assignments[i] = nearest;
                changed = true;
            }
        }
        if !changed {
            break;
        }
        for (j, centroid) in centroids.iter_mut().enumerate() {
            let members: Vec<&[f64; 3]> = matrix
                .iter()
                .zip(assignments.iter())
                .filter(|(_, &a)| a == j)
                .map(|(r, _)| r)
                .collect();
            // An emptied cluster keeps its previous centroid.
            if members.is_empty() {
                continue;
            }
            for d in 0..3 {
                centroid[d] = members.iter().map(|m| m[d]).sum::<f64>() / members.len() as f64;
            }
        }
    }
    assignments
}

fn distance2(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    (0..3).map(|d| (a[d] - b[d]).powi(2)).sum()
}

// =============================================================================
// Interpretation table
// =============================================================================

fn interpret(c: &RegimeCharacteristics, global_avg_volatility: f64) -> String {
    let act = c.avg_activity_index;
    let int = c.avg_intent_index;

    if act > HIGH && int > HIGH {
        return "Bull market — high whale activity with accumulation".to_string();
    }
    if act > HIGH && int < LOW {
        return "Distribution phase — high whale activity with selling pressure".to_string();
    }
    if act < LOW && int > HIGH {
        return "Stealth accumulation — quiet accumulation at low activity".to_string();
    }
    if act < LOW && int < LOW {
        return "Capitulation — low activity with selling pressure".to_string();
    }

    // Ambiguous activity/intent combination: fall back to volatility, then
    // drift direction.
    if c.avg_volatility > 1.5 * global_avg_volatility {
        return "High-volatility transition — mixed whale signals amid large swings".to_string();
    }
    match c.avg_return {
        Some(r) if r > 0.0 => "Quiet uptrend — balanced whale flows with positive drift".to_string(),
        Some(_) => "Quiet downtrend — balanced whale flows with negative drift".to_string(),
        None => "Neutral consolidation — balanced whale activity".to_string(),
    }
}

fn global_mean_volatility(rows: &[FeatureRow]) -> f64 {
    rows.iter().map(|r| r.volatility).sum::<f64>() / rows.len() as f64
}

fn mean_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
