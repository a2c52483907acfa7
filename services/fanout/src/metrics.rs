//! Dispatch metrics
//!
//! Counter-only view of fan-out progress. All counters are relaxed
//! atomics; `export` reads them one at a time, so the map is a near
//! point-in-time picture, not an atomic one.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for the fan-out dispatcher.
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Events claimed from the log and processed.
    pub events_consumed: AtomicU64,
    /// Snapshots recomputed and handed to the hub.
    pub snapshots_published: AtomicU64,
    /// Idle sweeps over the live quiz set.
    pub sweeps_run: AtomicU64,
    /// Batches acknowledged back to the log.
    pub ack_batches: AtomicU64,
    /// Failed acknowledgments (entries redeliver instead).
    pub ack_failures: AtomicU64,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_events(&self, count: usize) {
        self.events_consumed
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_snapshot(&self) {
        self.snapshots_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sweep(&self) {
        self.sweeps_run.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ack_batch(&self) {
        self.ack_batches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ack_failure(&self) {
        self.ack_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Export all counters as a sorted name/value map.
    pub fn export(&self) -> BTreeMap<String, u64> {
        let mut m = BTreeMap::new();
        m.insert(
            "events_consumed".to_string(),
            self.events_consumed.load(Ordering::Relaxed),
        );
        m.insert(
            "snapshots_published".to_string(),
            self.snapshots_published.load(Ordering::Relaxed),
        );
        m.insert(
            "sweeps_run".to_string(),
            self.sweeps_run.load(Ordering::Relaxed),
        );
        m.insert(
            "ack_batches".to_string(),
            self.ack_batches.load(Ordering::Relaxed),
        );
        m.insert(
            "ack_failures".to_string(),
            self.ack_failures.load(Ordering::Relaxed),
        );
        m
    }
}
