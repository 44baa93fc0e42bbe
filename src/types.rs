// =============================================================================
// Shared types used across the WAI backend
// =============================================================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One day of merged whale + market data. This is the unit every calculator
/// consumes; records are always sorted ascending by date with unique dates.
///
/// The three `asset_*` fields come from the secondary price feed and stay
/// `None` when that fetch fails or the date is missing from it — downstream
/// code must propagate the absence rather than fabricate values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub whale_tx_count: u64,
    pub whale_tx_volume: f64,
    #[serde(default)]
    pub exchange_inflow: f64,
    #[serde(default)]
    pub exchange_outflow: f64,
    #[serde(default)]
    pub asset_close: Option<f64>,
    #[serde(default)]
    pub asset_return_1d: Option<f64>,
    #[serde(default)]
    pub asset_volatility_7d: Option<f64>,
}

/// Categorical reading of the Whale Intent Index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentSignal {
    SellingPressure,
    Neutral,
    Accumulation,
}

impl IntentSignal {
    /// Classify an intent index value. Zero-flow days are forced to
    /// `Neutral` by the caller before this runs.
    pub fn from_index(index: i64) -> Self {
        if index < 30 {
            Self::SellingPressure
        } else if index > 70 {
            Self::Accumulation
        } else {
            Self::Neutral
        }
    }
}

impl std::fmt::Display for IntentSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SellingPressure => write!(f, "selling_pressure"),
            Self::Neutral => write!(f, "neutral"),
            Self::Accumulation => write!(f, "accumulation"),
        }
    }
}

/// Five-way banding of index momentum (index minus its 7-day mean).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MomentumBand {
    StrongAcceleration,
    Acceleration,
    Neutral,
    Deceleration,
    StrongDeceleration,
}

impl MomentumBand {
    pub fn from_value(momentum: f64) -> Self {
        if momentum > 20.0 {
            Self::StrongAcceleration
        } else if momentum > 10.0 {
            Self::Acceleration
        } else if momentum < -20.0 {
            Self::StrongDeceleration
        } else if momentum < -10.0 {
            Self::Deceleration
        } else {
            Self::Neutral
        }
    }
}

/// Confidence-score banding at 80 / 60 / 40.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBand {
    VeryHigh,
    High,
    Moderate,
    Low,
}

impl ConfidenceBand {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Self::VeryHigh
        } else if score >= 60.0 {
            Self::High
        } else if score >= 40.0 {
            Self::Moderate
        } else {
            Self::Low
        }
    }
}

/// Threshold predicate on the intent index used by the backtest engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BacktestSignal {
    Accumulation,
    StrongAccumulation,
    SellingPressure,
    StrongSelling,
}

impl BacktestSignal {
    pub const VALID_NAMES: [&'static str; 4] = [
        "accumulation",
        "strong_accumulation",
        "selling_pressure",
        "strong_selling",
    ];

    /// Parse a signal name from a query parameter. Unknown names are a
    /// client error; the message lists the valid options.
    pub fn parse(name: &str) -> Result<Self, String> {
        match name {
            "accumulation" => Ok(Self::Accumulation),
            "strong_accumulation" => Ok(Self::StrongAccumulation),
            "selling_pressure" => Ok(Self::SellingPressure),
            "strong_selling" => Ok(Self::StrongSelling),
            other => Err(format!(
                "unknown signal '{}', expected one of: {}",
                other,
                Self::VALID_NAMES.join(", ")
            )),
        }
    }

    /// Does the predicate hold for this intent index value?
    pub fn matches(self, intent_index: i64) -> bool {
        match self {
            Self::Accumulation => intent_index > 70,
            Self::StrongAccumulation => intent_index > 85,
            Self::SellingPressure => intent_index < 30,
            Self::StrongSelling => intent_index < 15,
        }
    }

    /// Bearish predicates frame wins as negative forward returns (short
    /// bias); bullish predicates as positive.
    pub fn is_bearish(self) -> bool {
        matches!(self, Self::SellingPressure | Self::StrongSelling)
    }
}

impl std::fmt::Display for BacktestSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accumulation => write!(f, "accumulation"),
            Self::StrongAccumulation => write!(f, "strong_accumulation"),
            Self::SellingPressure => write!(f, "selling_pressure"),
            Self::StrongSelling => write!(f, "strong_selling"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_signal_thresholds() {
        assert_eq!(IntentSignal::from_index(29), IntentSignal::SellingPressure);
        assert_eq!(IntentSignal::from_index(30), IntentSignal::Neutral);
        assert_eq!(IntentSignal::from_index(70), IntentSignal::Neutral);
        assert_eq!(IntentSignal::from_index(71), IntentSignal::Accumulation);
    }

    #[test]
    fn momentum_bands() {
        assert_eq!(MomentumBand::from_value(25.0), MomentumBand::StrongAcceleration);
        assert_eq!(MomentumBand::from_value(15.0), MomentumBand::Acceleration);
        assert_eq!(MomentumBand::from_value(0.0), MomentumBand::Neutral);
        assert_eq!(MomentumBand::from_value(-15.0), MomentumBand::Deceleration);
        assert_eq!(MomentumBand::from_value(-25.0), MomentumBand::StrongDeceleration);
        // Boundaries are inclusive of the neutral band.
        assert_eq!(MomentumBand::from_value(10.0), MomentumBand::Neutral);
        assert_eq!(MomentumBand::from_value(-10.0), MomentumBand::Neutral);
    }

    #[test]
    fn confidence_bands() {
        assert_eq!(ConfidenceBand::from_score(85.0), ConfidenceBand::VeryHigh);
        assert_eq!(ConfidenceBand::from_score(70.0), ConfidenceBand::High);
        assert_eq!(ConfidenceBand::from_score(50.0), ConfidenceBand::Moderate);
        assert_eq!(ConfidenceBand::from_score(10.0), ConfidenceBand::Low);
    }

    #[test]
    fn backtest_signal_parse() {
        assert_eq!(
            BacktestSignal::parse("selling_pressure").unwrap(),
            BacktestSignal::SellingPressure
        );
        let err = BacktestSignal::parse("bogus").unwrap_err();
        assert!(err.contains("accumulation"));
        assert!(err.contains("strong_selling"));
    }

    #[test]
    fn backtest_signal_predicates() {
        assert!(BacktestSignal::Accumulation.matches(71));
        assert!(!BacktestSignal::Accumulation.matches(70));
        assert!(BacktestSignal::StrongSelling.matches(14));
        assert!(!BacktestSignal::StrongSelling.matches(15));
        assert!(BacktestSignal::SellingPressure.is_bearish());
        assert!(!BacktestSignal::StrongAccumulation.is_bearish());
    }
}
