// =============================================================================
// Percentile Rescaler — raw score to [0, 100] index
// =============================================================================
//
// A raw combined score is mapped to an integer index by ranking each value
// within a trailing reference window (180 points by default), scaling the
// rank to [0, 100], and rounding. The activity index additionally smooths the
// scaled series with an EMA before the final round; the intent index does
// not.
//
// The earliest point in history has a single-point window and therefore
// always lands at the 100th percentile — expected, not an error.
// =============================================================================

use crate::series::{or_zero, rolling};

/// Rescale a raw score series to an integer index in `[min, max]`.
///
/// `smoothing_span` of `Some(span)` applies an EMA pass over the scaled
/// values before the final rounding.
pub fn rescale(
    raw: &[f64],
    window: usize,
    smoothing_span: Option<usize>,
    clamp: (i64, i64),
) -> Vec<i64> {
    let sanitized: Vec<f64> = raw.iter().map(|&v| or_zero(v)).collect();
    let ranks = rolling::rolling_percentile_rank(&sanitized, window);
    let scaled: Vec<f64> = ranks.iter().map(|r| (r * 100.0).round()).collect();

    let smoothed = match smoothing_span {
        Some(span) => rolling::ewma(&scaled, span),
        None => scaled,
    };

    smoothed
        .iter()
        .map(|&v| (v.round() as i64).clamp(clamp.0, clamp.1))
        .collect()
}
