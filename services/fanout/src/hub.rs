//! Snapshot broadcast hub
//!
//! Single fan-in point between the dispatcher and the delivery
//! surfaces. The dispatcher publishes every recomputed snapshot here;
//! SSE handlers and the WebSocket forwarder subscribe. A lagging
//! subscriber skips ahead to later snapshots instead of slowing the
//! publisher; snapshots carry full leaderboard state, so a skipped
//! frame is superseded by the next one received.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;
use types::ids::QuizId;
use types::snapshot::LeaderboardSnapshot;

/// Default broadcast channel capacity.
pub const DEFAULT_HUB_CAPACITY: usize = 256;

/// Broadcasts recomputed leaderboard snapshots to all subscribers.
pub struct SnapshotHub {
    sender: broadcast::Sender<Arc<LeaderboardSnapshot>>,
    /// Most recent snapshot per quiz, served to late subscribers.
    latest: DashMap<QuizId, Arc<LeaderboardSnapshot>>,
}

impl SnapshotHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            latest: DashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_HUB_CAPACITY)
    }

    /// Publish a recomputed snapshot to every subscriber.
    ///
    /// Never blocks. With no subscribers the send is a no-op and only
    /// the latest-snapshot cache is refreshed. Returns the shared
    /// handle so callers can reuse the allocation.
    pub fn publish(&self, snapshot: LeaderboardSnapshot) -> Arc<LeaderboardSnapshot> {
        let shared = Arc::new(snapshot);
        self.latest.insert(shared.quiz_id, Arc::clone(&shared));
        let _ = self.sender.send(Arc::clone(&shared));
        shared
    }

    /// Subscribe to all snapshots published from this point on.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<LeaderboardSnapshot>> {
        self.sender.subscribe()
    }

    /// Most recent snapshot published for a quiz, if any.
    pub fn latest(&self, quiz_id: QuizId) -> Option<Arc<LeaderboardSnapshot>> {
        self.latest
            .get(&quiz_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Latest snapshot of every quiz, ordered by quiz id.
    pub fn latest_all(&self) -> Vec<Arc<LeaderboardSnapshot>> {
        let mut all: Vec<Arc<LeaderboardSnapshot>> = self
            .latest
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        all.sort_by_key(|snapshot| snapshot.quiz_id);
        all
    }

    /// Number of live broadcast subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Number of quizzes with a cached snapshot.
    pub fn quiz_count(&self) -> usize {
        self.latest.len()
    }
}

impl Default for SnapshotHub {
    fn default() -> Self {
        Self::with_defaults()
    }
}
