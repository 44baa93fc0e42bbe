// =============================================================================
// Application State — shared, immutable per process
// =============================================================================
//
// Nothing here mutates after startup: the engine holds its fixed
// configuration and the feed client is stateless, so handlers share a plain
// `Arc<AppState>` with no locks. Every request refreshes the history and
// recomputes; computed indices are never persisted.
// =============================================================================

use anyhow::Result;
use tracing::debug;

use crate::engine::{ActivityPoint, IndexEngine, IntentPoint};
use crate::engine_config::EngineConfig;
use crate::feed::FeedClient;
use crate::types::DailyRecord;

/// One request's worth of fetched history and computed index series, aligned
/// 1:1 by date.
pub struct Computed {
    pub records: Vec<DailyRecord>,
    pub activity: Vec<ActivityPoint>,
    pub intent: Vec<IntentPoint>,
}

pub struct AppState {
    pub engine: IndexEngine,
    pub feed: FeedClient,
}

impl AppState {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let feed = FeedClient::new(&config)?;
        Ok(Self {
            engine: IndexEngine::new(config),
            feed,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        self.engine.config()
    }

    /// Fetch the full history and compute both index series.
    pub async fn computed(&self) -> Result<Computed> {
        let records = self.feed.fetch_history().await?;
        let activity = self.engine.activity(&records);
        let intent = self.engine.intent(&records);
        debug!(days = records.len(), "history fetched and indices computed");
        Ok(Computed {
            records,
            activity,
            intent,
        })
    }
}
