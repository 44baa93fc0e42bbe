// =============================================================================
// Index Engine — orchestrates normalizer, weighting, and rescaler
// =============================================================================
//
// All computations are pure functions over the fetched daily records: the
// engine holds only its immutable configuration, recomputes from scratch on
// every call, and shares no mutable state across requests.
// =============================================================================

pub mod activity;
pub mod derived;
pub mod intent;
pub mod rescale;
pub mod weights;

use crate::engine_config::EngineConfig;
use crate::types::DailyRecord;

pub use activity::ActivityPoint;
pub use derived::{ConfidencePoint, MomentumPoint};
pub use intent::IntentPoint;

/// The index-calculation engine. Cheap to clone; configuration is fixed at
/// construction.
#[derive(Debug, Clone)]
pub struct IndexEngine {
    config: EngineConfig,
}

impl IndexEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Activity index (current + legacy variant) over the full history.
    pub fn activity(&self, records: &[DailyRecord]) -> Vec<ActivityPoint> {
        activity::compute(records, &self.config)
    }

    /// Intent index with categorical signal over the full history.
    pub fn intent(&self, records: &[DailyRecord]) -> Vec<IntentPoint> {
        intent::compute(records, &self.config)
    }

    /// Momentum of an already computed index series.
    pub fn momentum(
        &self,
        dates: &[chrono::NaiveDate],
        index: &[i64],
    ) -> Vec<MomentumPoint> {
        derived::compute_momentum(dates, index, &self.config)
    }

    /// Confidence score over the raw inputs.
    pub fn confidence(&self, records: &[DailyRecord]) -> Vec<ConfidencePoint> {
        derived::compute_confidence(records, &self.config)
    }
}
