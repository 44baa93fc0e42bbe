// =============================================================================
// Baseline Normalizer
// =============================================================================
//
// A baseline is the rolling reference value a raw metric is divided by:
// normalized 1.0 means "at baseline". The method is a single process-wide
// configuration value, not a per-call choice.
//
// Division by a zero baseline is a data condition, not a failure: it yields
// NaN here and is coerced to 0.0 by every consumer via `series::or_zero`.
// =============================================================================

use serde::{Deserialize, Serialize};

use super::rolling;

/// How the rolling reference value is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineMethod {
    /// Arithmetic mean of the trailing window.
    MovingAverage,
    /// Exponentially weighted mean over the entire history (span = window).
    Exponential,
    /// Rolling median — robust against single-day outliers.
    Median,
}

impl Default for BaselineMethod {
    fn default() -> Self {
        Self::Median
    }
}

impl std::fmt::Display for BaselineMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MovingAverage => write!(f, "moving_average"),
            Self::Exponential => write!(f, "exponential"),
            Self::Median => write!(f, "median"),
        }
    }
}

/// Compute the baseline series for `values` with the given window/span.
pub fn baseline(method: BaselineMethod, values: &[f64], window: usize) -> Vec<f64> {
    match method {
        BaselineMethod::MovingAverage => rolling::rolling_mean(values, window),
        BaselineMethod::Exponential => rolling::ewma(values, window),
        BaselineMethod::Median => rolling::rolling_median(values, window),
    }
}

/// Element-wise `raw / baseline`. Zero or non-finite baselines produce NaN,
/// which downstream aggregation treats as zero activity.
pub fn normalize(raw: &[f64], base: &[f64]) -> Vec<f64> {
    raw.iter()
        .zip(base.iter())
        .map(|(&r, &b)| if b != 0.0 && b.is_finite() { r / b } else { f64::NAN })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_baseline_normalizes_to_one_on_flat_series() {
        let raw = vec![10.0; 50];
        let base = baseline(BaselineMethod::Median, &raw, 30);
        let norm = normalize(&raw, &base);
        assert!(norm.iter().all(|v| (v - 1.0).abs() < 1e-12));
    }

    #[test]
    fn zero_baseline_yields_nan() {
        let raw = vec![0.0, 0.0, 5.0];
        let base = baseline(BaselineMethod::MovingAverage, &raw, 2);
        let norm = normalize(&raw, &base);
        assert!(norm[0].is_nan()); // 0 / 0
        assert!(norm[1].is_nan());
        assert!(norm[2].is_finite()); // 5 / 2.5
    }

    #[test]
    fn exponential_uses_full_history() {
        let mut raw = vec![1.0; 10];
        raw.push(100.0);
        let base = baseline(BaselineMethod::Exponential, &raw, 5);
        // The EWMA reacts to the spike but stays below it.
        let last = *base.last().unwrap();
        assert!(last > 1.0 && last < 100.0);
    }
}
