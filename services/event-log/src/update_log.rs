//! Async facade over the log state
//!
//! [`UpdateLog`] is the handle the rest of the pipeline shares: appends
//! from ingestion, blocking reads and acknowledgments from fan-out
//! workers. The only intentional wait in the whole pipeline lives
//! here: `read_next` parks its caller until an append lands, a pending
//! entry comes due for redelivery, or the block duration expires.

use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tokio::time::{self, Instant};

use crate::event::{EventId, ScoreEvent};
use crate::log::{LogConfig, LogError, LogState};

/// Name of the score-event stream this log carries.
pub const STREAM_NAME: &str = "quiz-score-events";

/// Shared append-only log of score events.
///
/// Clock note: redelivery timing runs on the runtime clock relative to
/// construction, so tests under a paused runtime control it exactly.
#[derive(Debug)]
pub struct UpdateLog {
    state: Mutex<LogState>,
    notify: Notify,
    epoch: Instant,
}

impl UpdateLog {
    pub fn new(config: LogConfig) -> Self {
        Self {
            state: Mutex::new(LogState::new(config)),
            notify: Notify::new(),
            epoch: Instant::now(),
        }
    }

    fn now_nanos(&self) -> i64 {
        self.epoch.elapsed().as_nanos() as i64
    }

    /// Append an event and wake blocked readers.
    pub async fn append(&self, event: ScoreEvent) -> Result<EventId, LogError> {
        let id = self.state.lock().await.append(event)?;
        self.notify.notify_waiters();
        Ok(id)
    }

    /// Create the consumer group if missing; `false` means it already
    /// existed, which callers treat the same as created.
    pub async fn ensure_group(&self, group: &str) -> bool {
        self.state.lock().await.ensure_group(group)
    }

    /// Read up to `max_count` entries for `consumer`, blocking up to
    /// `block` while nothing is deliverable.
    ///
    /// Returns an empty batch on timeout; callers use that as their
    /// cue to run the stale-refresh sweep. On a closed log the call
    /// returns whatever is still deliverable without waiting, so
    /// drain-then-stop shutdown works.
    pub async fn read_next(
        &self,
        group: &str,
        consumer: &str,
        max_count: usize,
        block: Duration,
    ) -> Result<Vec<(EventId, Arc<ScoreEvent>)>, LogError> {
        let deadline = Instant::now() + block;
        loop {
            let mut state = self.state.lock().await;
            let batch = state.read_batch(group, consumer, max_count, self.now_nanos())?;
            if !batch.is_empty() || state.is_closed() {
                return Ok(batch);
            }
            if Instant::now() >= deadline {
                return Ok(Vec::new());
            }

            // Wake on the next append, or when the earliest pending
            // entry comes due, whichever is first.
            let wake_at = state
                .next_due_nanos(group)
                .map(|due| self.epoch + Duration::from_nanos(due.max(0) as u64))
                .map_or(deadline, |due_at| due_at.min(deadline));

            // Register for notification before releasing the lock, so
            // an append landing right after the release still wakes us.
            let mut notified = pin!(self.notify.notified());
            notified.as_mut().enable();
            drop(state);

            tokio::select! {
                _ = &mut notified => {}
                _ = time::sleep_until(wake_at) => {}
            }
        }
    }

    /// Retire delivered entries from the group's pending set.
    pub async fn acknowledge(&self, group: &str, event_ids: &[EventId]) -> Result<usize, LogError> {
        self.state.lock().await.acknowledge(group, event_ids)
    }

    /// Stop accepting appends and release blocked readers.
    pub async fn close(&self) {
        self.state.lock().await.close();
        self.notify.notify_waiters();
    }

    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.is_closed()
    }

    /// Entries currently retained.
    pub async fn retained_len(&self) -> usize {
        self.state.lock().await.retained_len()
    }

    /// Read-but-unacknowledged entries for a group.
    pub async fn pending_count(&self, group: &str) -> usize {
        self.state.lock().await.pending_count(group)
    }

    /// How many times an entry has been handed out to a group.
    pub async fn delivery_count(&self, group: &str, id: EventId) -> Option<u32> {
        self.state.lock().await.delivery_count(group, id)
    }
}

impl Default for UpdateLog {
    fn default() -> Self {
        Self::new(LogConfig::default())
    }
}
