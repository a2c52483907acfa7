//! Fan-out dispatcher
//!
//! The log consumer of the pipeline. Claims event batches for the
//! fan-out group, recomputes the affected leaderboards, publishes
//! snapshots to the hub, and acknowledges the batch only after every
//! hand-off. A crash between hand-off and ack redelivers the batch
//! instead of losing it.
//!
//! An idle log triggers the stale-refresh sweep: the current snapshot
//! of every live quiz is republished. The sweep also repairs updates
//! whose event append failed at ingestion.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use event_log::{EventId, ScoreEvent, UpdateLog};
use leaderboard::LeaderboardStore;
use tokio::sync::watch;
use tokio::time;
use tracing::{debug, error, info};
use types::ids::QuizId;

use crate::hub::SnapshotHub;
use crate::metrics::DispatchMetrics;

/// Consumer group every dispatcher instance joins.
pub const FANOUT_GROUP: &str = "leaderboard-fanout";

/// Configuration for the fan-out dispatcher.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Consumer name within the fan-out group.
    pub consumer: String,
    /// Maximum events claimed per read.
    pub batch_size: usize,
    /// How long a read blocks while nothing is deliverable.
    pub block: Duration,
    /// Idle pause after a sweep before the next read.
    pub sweep_pause: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            consumer: "fanout-worker-1".to_string(),
            batch_size: 10,
            block: Duration::from_secs(5),
            sweep_pause: Duration::from_millis(500),
        }
    }
}

/// Consumes the update log and pushes recomputed snapshots to the hub.
pub struct FanoutDispatcher {
    store: Arc<LeaderboardStore>,
    log: Arc<UpdateLog>,
    hub: Arc<SnapshotHub>,
    metrics: Arc<DispatchMetrics>,
    config: DispatcherConfig,
}

impl FanoutDispatcher {
    pub fn new(
        store: Arc<LeaderboardStore>,
        log: Arc<UpdateLog>,
        hub: Arc<SnapshotHub>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            store,
            log,
            hub,
            metrics: Arc::new(DispatchMetrics::new()),
            config,
        }
    }

    /// Shared handle to the dispatch counters.
    pub fn metrics(&self) -> Arc<DispatchMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run until the log closes or `shutdown` flips to true.
    ///
    /// A batch already claimed is dispatched and acknowledged before
    /// shutdown is observed; a read in flight when shutdown fires is
    /// abandoned and its entries redeliver to the next consumer.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        self.log.ensure_group(FANOUT_GROUP).await;
        info!(
            group = FANOUT_GROUP,
            consumer = %self.config.consumer,
            batch_size = self.config.batch_size,
            "fanout dispatcher started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let read = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                read = self.log.read_next(
                    FANOUT_GROUP,
                    &self.config.consumer,
                    self.config.batch_size,
                    self.config.block,
                ) => read,
            };

            let batch = match read {
                Ok(batch) => batch,
                Err(err) => {
                    error!(error = %err, "log read failed; retrying next cycle");
                    if !self.idle_pause(&mut shutdown).await {
                        break;
                    }
                    continue;
                }
            };

            if batch.is_empty() {
                if self.log.is_closed().await {
                    break;
                }
                self.sweep();
                if !self.idle_pause(&mut shutdown).await {
                    break;
                }
                continue;
            }

            self.dispatch(&batch).await;
        }

        info!("fanout dispatcher stopped");
    }

    /// Recompute and publish each quiz in the batch once, then
    /// acknowledge the whole batch.
    async fn dispatch(&self, batch: &[(EventId, Arc<ScoreEvent>)]) {
        let quiz_ids: BTreeSet<QuizId> = batch.iter().map(|(_, event)| event.quiz_id).collect();
        for quiz_id in quiz_ids {
            self.publish_quiz(quiz_id);
        }
        self.metrics.record_events(batch.len());

        let event_ids: Vec<EventId> = batch.iter().map(|(event_id, _)| *event_id).collect();
        match self.log.acknowledge(FANOUT_GROUP, &event_ids).await {
            Ok(retired) => {
                self.metrics.record_ack_batch();
                debug!(
                    events = event_ids.len(),
                    retired, "dispatched and acknowledged batch"
                );
            }
            Err(err) => {
                // Unacked entries redeliver after the idle timeout.
                self.metrics.record_ack_failure();
                error!(error = %err, "acknowledge failed; entries will redeliver");
            }
        }
    }

    /// Republish the current snapshot of every live quiz.
    fn sweep(&self) {
        let mut quiz_ids = self.store.quiz_ids();
        if quiz_ids.is_empty() {
            return;
        }
        quiz_ids.sort();
        for quiz_id in &quiz_ids {
            self.publish_quiz(*quiz_id);
        }
        self.metrics.record_sweep();
        debug!(quizzes = quiz_ids.len(), "stale-refresh sweep published");
    }

    fn publish_quiz(&self, quiz_id: QuizId) {
        let snapshot = self.store.snapshot(quiz_id);
        self.hub.publish(snapshot);
        self.metrics.record_snapshot();
    }

    /// Pause between cycles, waking early on shutdown. `false` means
    /// shutdown fired.
    async fn idle_pause(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
        tokio::select! {
            biased;
            _ = shutdown.changed() => false,
            _ = time::sleep(self.config.sweep_pause) => true,
        }
    }
}
