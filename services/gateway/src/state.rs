use std::sync::Arc;

use fanout::{ConnectionRegistry, QuizCatalog, ScoreIngestion, SnapshotHub};
use leaderboard::LeaderboardStore;

use crate::config::GatewayConfig;

/// Shared pipeline handles passed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<LeaderboardStore>,
    pub ingestion: Arc<ScoreIngestion>,
    pub hub: Arc<SnapshotHub>,
    pub registry: Arc<ConnectionRegistry>,
    pub catalog: Option<Arc<dyn QuizCatalog>>,
    pub config: GatewayConfig,
}
