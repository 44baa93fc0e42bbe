// =============================================================================
// Test fixtures — synthetic daily record builders
// =============================================================================

use chrono::{Days, NaiveDate};

use crate::types::DailyRecord;

pub fn day(i: usize) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .checked_add_days(Days::new(i as u64))
        .unwrap()
}

fn record(i: usize, tx: u64, volume: f64) -> DailyRecord {
    DailyRecord {
        date: day(i),
        whale_tx_count: tx,
        whale_tx_volume: volume,
        exchange_inflow: 0.0,
        exchange_outflow: 0.0,
        asset_close: None,
        asset_return_1d: None,
        asset_volatility_7d: None,
    }
}

/// `n` days of constant tx count and volume, zero exchange flow, no prices.
pub fn flat_records(n: usize, tx: u64, volume: f64) -> Vec<DailyRecord> {
    (0..n).map(|i| record(i, tx, volume)).collect()
}

/// `n` days with per-day (tx count, volume) from `f`.
pub fn records_with(n: usize, f: impl Fn(usize) -> (u64, f64)) -> Vec<DailyRecord> {
    (0..n)
        .map(|i| {
            let (tx, volume) = f(i);
            record(i, tx, volume)
        })
        .collect()
}

/// `n` days with constant metrics and per-day (inflow, outflow) from `f`.
pub fn flow_records(n: usize, f: impl Fn(usize) -> (f64, f64)) -> Vec<DailyRecord> {
    (0..n)
        .map(|i| {
            let (inflow, outflow) = f(i);
            let mut r = record(i, 100, 10.0);
            r.exchange_inflow = inflow;
            r.exchange_outflow = outflow;
            r
        })
        .collect()
}

/// Attach a close-price path (and derived 1-day returns plus a flat 7-day
/// volatility) to existing records.
pub fn with_prices(records: &mut [DailyRecord], price: impl Fn(usize) -> f64) {
    let closes: Vec<f64> = (0..records.len()).map(&price).collect();
    for (i, r) in records.iter_mut().enumerate() {
        r.asset_close = Some(closes[i]);
        r.asset_return_1d = if i > 0 && closes[i - 1] != 0.0 {
            Some((closes[i] - closes[i - 1]) / closes[i - 1])
        } else {
            None
        };
        r.asset_volatility_7d = if i >= 6 { Some(0.02) } else { None };
    }
}
