// =============================================================================
// Legacy comparison — static 50/50 index vs adaptively weighted index
// =============================================================================
//
// Side-by-side statistics for the legacy activity index (static weights, no
// smoothing) and the current one (adaptive weights, EMA-smoothed), retained
// to make the behavioral difference of the weighting change observable:
// dispersion, saturation at 100, sensitivity in high-activity phases, and
// how far the adaptive weights actually move.
// =============================================================================

use std::collections::BTreeMap;

use serde::Serialize;

use crate::engine::ActivityPoint;
use crate::series::rolling::{pearson, sample_std};

/// High-activity threshold for the sensitivity section.
const HIGH_ACTIVITY: i64 = 75;

#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub min: i64,
    pub max: i64,
    pub count_at_100: usize,
    pub pct_at_100: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistogramBucket {
    pub legacy: usize,
    pub current: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SensitivityStats {
    pub high_activity_days_legacy: usize,
    pub high_activity_days_current: usize,
    pub avg_index_high_activity_legacy: Option<f64>,
    pub avg_index_high_activity_current: Option<f64>,
    /// Correlation of the two indices over days either flags as high
    /// activity.
    pub correlation_high_activity: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeightStats {
    pub avg_weight_tx: f64,
    pub avg_weight_volume: f64,
    pub std_weight_tx: f64,
    pub min_weight_tx: f64,
    pub max_weight_tx: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonFindings {
    pub higher_dispersion_current: bool,
    pub more_saturation_legacy: bool,
    pub better_spike_sensitivity_current: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub total_days: usize,
    pub legacy: IndexStats,
    pub current: IndexStats,
    /// 5-wide buckets "0-5" .. "95-100", day counts per variant.
    pub histogram: BTreeMap<String, HistogramBucket>,
    pub sensitivity: SensitivityStats,
    pub weights: WeightStats,
    pub key_findings: ComparisonFindings,
}

/// Compare the legacy and current activity index over the full history.
pub fn compare(activity: &[ActivityPoint]) -> ComparisonReport {
    let legacy: Vec<i64> = activity.iter().map(|p| p.index_legacy).collect();
    let current: Vec<i64> = activity.iter().map(|p| p.index).collect();

    let legacy_stats = index_stats(&legacy);
    let current_stats = index_stats(&current);

    // Bucket keys carry zero-padded bounds so the BTreeMap iterates them in
    // numeric order.
    let mut histogram = BTreeMap::new();
    for lo in (0..100).step_by(5) {
        let hi = lo + 5;
        let in_bucket = |v: i64| {
            // Upper-inclusive final bucket so 100 lands in 95-100.
            if hi == 100 {
                v >= lo && v <= hi
            } else {
                v >= lo && v < hi
            }
        };
        histogram.insert(
            format!("{lo:03}-{hi:03}"),
            HistogramBucket {
                legacy: legacy.iter().filter(|&&v| in_bucket(v)).count(),
                current: current.iter().filter(|&&v| in_bucket(v)).count(),
            },
        );
    }

    let high_legacy: Vec<usize> = (0..legacy.len()).filter(|&i| legacy[i] > HIGH_ACTIVITY).collect();
    let high_current: Vec<usize> =
        (0..current.len()).filter(|&i| current[i] > HIGH_ACTIVITY).collect();
    let high_union: Vec<usize> = (0..legacy.len())
        .filter(|&i| legacy[i] > HIGH_ACTIVITY || current[i] > HIGH_ACTIVITY)
        .collect();

    let avg_over = |idx: &[usize], series: &[i64]| {
        (!idx.is_empty()).then(|| idx.iter().map(|&i| series[i] as f64).sum::<f64>() / idx.len() as f64)
    };
    let correlation_high_activity = if high_union.len() >= 2 {
        let xs: Vec<f64> = high_union.iter().map(|&i| legacy[i] as f64).collect();
        let ys: Vec<f64> = high_union.iter().map(|&i| current[i] as f64).collect();
        pearson(&xs, &ys)
    } else {
        None
    };

    let sensitivity = SensitivityStats {
        high_activity_days_legacy: high_legacy.len(),
        high_activity_days_current: high_current.len(),
        avg_index_high_activity_legacy: avg_over(&high_legacy, &legacy),
        avg_index_high_activity_current: avg_over(&high_current, &current),
        correlation_high_activity,
    };

    let tx_weights: Vec<f64> = activity.iter().map(|p| p.weight_tx).collect();
    let vol_weights: Vec<f64> = activity.iter().map(|p| p.weight_volume).collect();
    let n = activity.len().max(1) as f64;
    let weights = WeightStats {
        avg_weight_tx: tx_weights.iter().sum::<f64>() / n,
        avg_weight_volume: vol_weights.iter().sum::<f64>() / n,
        std_weight_tx: sample_std(&tx_weights),
        min_weight_tx: tx_weights.iter().copied().fold(f64::INFINITY, f64::min),
        max_weight_tx: tx_weights.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    };

    let key_findings = ComparisonFindings {
        higher_dispersion_current: current_stats.std > legacy_stats.std,
        more_saturation_legacy: legacy_stats.count_at_100 > current_stats.count_at_100,
        better_spike_sensitivity_current: high_current.len() > high_legacy.len(),
    };

    ComparisonReport {
        total_days: activity.len(),
        legacy: legacy_stats,
        current: current_stats,
        histogram,
        sensitivity,
        weights,
        key_findings,
    }
}

fn index_stats(series: &[i64]) -> IndexStats {
    let n = series.len();
    if n == 0 {
        return IndexStats {
            mean: 0.0,
            median: 0.0,
            std: 0.0,
            min: 0,
            max: 0,
            count_at_100: 0,
            pct_at_100: 0.0,
        };
    }
    let as_f64: Vec<f64> = series.iter().map(|&v| v as f64).collect();
    let mut sorted = series.to_vec();
    sorted.sort_unstable();
    let median = if n % 2 == 1 {
        sorted[n / 2] as f64
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) as f64 / 2.0
    };
    let count_at_100 = series.iter().filter(|&&v| v == 100).count();
    IndexStats {
        mean: as_f64.iter().sum::<f64>() / n as f64,
        median,
        std: sample_std(&as_f64),
        min: *sorted.first().expect("n > 0"),
        max: *sorted.last().expect("n > 0"),
        count_at_100,
        pct_at_100: 100.0 * count_at_100 as f64 / n as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::IndexEngine;
    use crate::engine_config::EngineConfig;
    use crate::testutil::records_with;

    #[test]
    fn histogram_counts_every_day_once() {
        let records = records_with(220, |i| ((10 + (i * 31) % 200) as u64, 1.0 + ((i * 7) % 53) as f64));
        let engine = IndexEngine::new(EngineConfig::default());
        let report = compare(&engine.activity(&records));
        let legacy_total: usize = report.histogram.values().map(|b| b.legacy).sum();
        let current_total: usize = report.histogram.values().map(|b| b.current).sum();
        assert_eq!(legacy_total, report.total_days);
        assert_eq!(current_total, report.total_days);
        assert_eq!(report.histogram.len(), 20);
    }

    #[test]
    fn stats_are_within_index_bounds() {
        let records = records_with(180, |i| ((5 + (i * 13) % 77) as u64, 2.0 + ((i * 3) % 19) as f64));
        let engine = IndexEngine::new(EngineConfig::default());
        let report = compare(&engine.activity(&records));
        for stats in [&report.legacy, &report.current] {
            assert!(stats.min >= 0 && stats.max <= 100);
            assert!((0.0..=100.0).contains(&stats.mean));
            assert!((0.0..=100.0).contains(&stats.pct_at_100));
        }
        assert!((0.0..=1.0).contains(&report.weights.avg_weight_tx));
        assert!(
            (report.weights.avg_weight_tx + report.weights.avg_weight_volume - 1.0).abs() < 1e-9
        );
    }

    #[test]
    fn empty_history_does_not_panic() {
        let report = compare(&[]);
        assert_eq!(report.total_days, 0);
        assert_eq!(report.legacy.count_at_100, 0);
    }
}
