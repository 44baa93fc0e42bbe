// =============================================================================
// Series — rolling-window primitives and the undefined-numeric policy
// =============================================================================
//
// A "series" here is a plain `Vec<f64>` aligned 1:1 with the daily records.
// All NaN fallbacks live in this module so that every consumer coerces
// undefined results to the same value per metric:
//
//   division by a zero baseline   -> 0.0   (no measurable activity)
//   missing percentile history    -> 0.5   (even weight split)
//   zero-total-flow intent day    -> 50    (neutral index, handled in intent)
// =============================================================================

pub mod baseline;
pub mod rolling;

/// Coerce an undefined numeric result to zero activity.
pub fn or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Coerce an undefined weight/rank to an even split.
pub fn or_half(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.5
    }
}
