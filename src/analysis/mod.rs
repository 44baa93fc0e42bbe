// =============================================================================
// Analysis layer — research reports computed on top of the index engine
// =============================================================================

pub mod backtest;
pub mod comparison;
pub mod lead_lag;
pub mod regime;
pub mod volatility;
