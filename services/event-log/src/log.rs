//! Core log state: append-only entries plus per-group cursors
//!
//! Pure state machine: every time-dependent operation takes an
//! explicit `now_nanos`, so redelivery behavior is fully deterministic
//! under test. The async facade in [`crate::update_log`] supplies real
//! clocks and blocking.
//!
//! Delivery model (at-least-once):
//! - a read hands entries to a consumer and marks them pending
//! - an acknowledged entry leaves the pending set for good
//! - a pending entry whose consumer has gone quiet past the
//!   redelivery timeout is handed out again, delivery count bumped
//!
//! Entries are retained until every group has acknowledged them, up to
//! `max_backlog`; beyond that appends fail rather than dropping
//! unacknowledged work.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use thiserror::Error;

use crate::event::{EventId, ScoreEvent};

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LogError {
    #[error("Backlog full: {current} retained entries >= limit {limit}")]
    Backlog { current: usize, limit: usize },

    #[error("Log is closed")]
    Closed,

    #[error("Unknown consumer group: {group}")]
    UnknownGroup { group: String },
}

// ── Configuration ───────────────────────────────────────────────────

/// Configuration for the update log.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Maximum retained (not fully acknowledged) entries.
    pub max_backlog: usize,
    /// Idle time after which a read-but-unacked entry is redelivered
    /// (default: 30s).
    pub redelivery_timeout_nanos: i64,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            max_backlog: 65_536,
            redelivery_timeout_nanos: 30 * 1_000_000_000,
        }
    }
}

// ── Group bookkeeping ───────────────────────────────────────────────

/// Delivery bookkeeping for one read-but-unacknowledged entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDelivery {
    /// Consumer name the entry was last handed to.
    pub consumer: String,
    /// When it was last handed out (nanos, caller's clock domain).
    pub delivered_at: i64,
    /// How many times it has been handed out.
    pub delivery_count: u32,
}

#[derive(Debug, Default)]
struct GroupState {
    /// Next unread log position for this group.
    next_offset: u64,
    /// Read-but-unacknowledged entries, in id (= append) order.
    pending: BTreeMap<EventId, PendingDelivery>,
}

// ── Log state ───────────────────────────────────────────────────────

/// Append-only event log with named consumer groups.
#[derive(Debug)]
pub struct LogState {
    config: LogConfig,
    /// Retained tail of the log; ids are contiguous ascending.
    entries: VecDeque<(EventId, Arc<ScoreEvent>)>,
    /// Position the next append will get.
    next_id: u64,
    groups: BTreeMap<String, GroupState>,
    closed: bool,
}

/// Position lookup. Ids are contiguous and trimmed from the front
/// only, so an entry's index is its distance from the head.
fn entry_at(
    entries: &VecDeque<(EventId, Arc<ScoreEvent>)>,
    first: Option<u64>,
    id: EventId,
) -> Option<Arc<ScoreEvent>> {
    let idx = id.as_u64().checked_sub(first?)? as usize;
    entries.get(idx).map(|(_, event)| Arc::clone(event))
}

impl LogState {
    pub fn new(config: LogConfig) -> Self {
        Self {
            config,
            entries: VecDeque::new(),
            next_id: 1,
            groups: BTreeMap::new(),
            closed: false,
        }
    }

    /// Append an event, assigning it the next log position.
    pub fn append(&mut self, event: ScoreEvent) -> Result<EventId, LogError> {
        if self.closed {
            return Err(LogError::Closed);
        }
        self.trim_acknowledged();
        if self.entries.len() >= self.config.max_backlog {
            return Err(LogError::Backlog {
                current: self.entries.len(),
                limit: self.config.max_backlog,
            });
        }
        let id = EventId::new(self.next_id);
        self.next_id += 1;
        self.entries.push_back((id, Arc::new(event)));
        Ok(id)
    }

    /// Create a consumer group if it does not exist.
    ///
    /// Idempotent: an existing group is left untouched and reported as
    /// `false`. A new group starts at the oldest retained entry, so it
    /// sees whatever history the log still holds.
    pub fn ensure_group(&mut self, group: &str) -> bool {
        if self.groups.contains_key(group) {
            return false;
        }
        let start = self
            .entries
            .front()
            .map_or(self.next_id, |(id, _)| id.as_u64());
        self.groups.insert(
            group.to_string(),
            GroupState {
                next_offset: start,
                pending: BTreeMap::new(),
            },
        );
        true
    }

    /// Hand up to `max_count` entries to `consumer` and mark them pending.
    ///
    /// Entries due for redelivery come first (their original order
    /// preserved), then unread entries in append order. Never blocks;
    /// the async facade owns the waiting.
    pub fn read_batch(
        &mut self,
        group: &str,
        consumer: &str,
        max_count: usize,
        now_nanos: i64,
    ) -> Result<Vec<(EventId, Arc<ScoreEvent>)>, LogError> {
        let timeout = self.config.redelivery_timeout_nanos;
        let entries = &self.entries;
        let first = entries.front().map(|(id, _)| id.as_u64());
        let state = self
            .groups
            .get_mut(group)
            .ok_or_else(|| LogError::UnknownGroup {
                group: group.to_string(),
            })?;

        let mut batch = Vec::new();

        // Redeliveries first: whoever read these never acknowledged
        // them and has been quiet past the timeout.
        let due: Vec<EventId> = state
            .pending
            .iter()
            .filter(|(_, d)| now_nanos.saturating_sub(d.delivered_at) >= timeout)
            .map(|(&id, _)| id)
            .take(max_count)
            .collect();

        for id in due {
            if let Some(event) = entry_at(entries, first, id) {
                if let Some(delivery) = state.pending.get_mut(&id) {
                    delivery.consumer = consumer.to_string();
                    delivery.delivered_at = now_nanos;
                    delivery.delivery_count += 1;
                }
                batch.push((id, event));
            }
        }

        // Then unread entries, advancing the group cursor.
        if let Some(first) = first {
            let start = state.next_offset.saturating_sub(first) as usize;
            for (id, event) in entries.iter().skip(start) {
                if batch.len() >= max_count {
                    break;
                }
                state.pending.insert(
                    *id,
                    PendingDelivery {
                        consumer: consumer.to_string(),
                        delivered_at: now_nanos,
                        delivery_count: 1,
                    },
                );
                state.next_offset = id.as_u64() + 1;
                batch.push((*id, Arc::clone(event)));
            }
        }

        Ok(batch)
    }

    /// Remove entries from the group's pending set.
    ///
    /// Unknown ids are ignored, so acknowledging twice is safe.
    /// Returns how many entries were actually retired.
    pub fn acknowledge(&mut self, group: &str, event_ids: &[EventId]) -> Result<usize, LogError> {
        let state = self
            .groups
            .get_mut(group)
            .ok_or_else(|| LogError::UnknownGroup {
                group: group.to_string(),
            })?;

        let mut retired = 0;
        for id in event_ids {
            if state.pending.remove(id).is_some() {
                retired += 1;
            }
        }
        self.trim_acknowledged();
        Ok(retired)
    }

    /// Earliest instant (nanos) at which some pending entry of this
    /// group becomes due for redelivery.
    pub fn next_due_nanos(&self, group: &str) -> Option<i64> {
        let state = self.groups.get(group)?;
        state
            .pending
            .values()
            .map(|d| d.delivered_at + self.config.redelivery_timeout_nanos)
            .min()
    }

    /// Stop accepting appends. Reads keep draining what is retained.
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Entries currently retained (acknowledged head already trimmed).
    pub fn retained_len(&self) -> usize {
        self.entries.len()
    }

    pub fn has_group(&self, group: &str) -> bool {
        self.groups.contains_key(group)
    }

    /// Read-but-unacknowledged entries for a group (0 if unknown).
    pub fn pending_count(&self, group: &str) -> usize {
        self.groups.get(group).map_or(0, |s| s.pending.len())
    }

    /// How many times an entry has been handed out to this group.
    pub fn delivery_count(&self, group: &str, id: EventId) -> Option<u32> {
        self.groups
            .get(group)?
            .pending
            .get(&id)
            .map(|d| d.delivery_count)
    }

    /// Drop head entries every group has moved past. With no groups
    /// the whole backlog is retained so a group created later can
    /// still read history.
    fn trim_acknowledged(&mut self) {
        if self.groups.is_empty() {
            return;
        }
        let mut watermark = u64::MAX;
        for state in self.groups.values() {
            let low = state
                .pending
                .keys()
                .next()
                .map_or(state.next_offset, |id| id.as_u64());
            watermark = watermark.min(low);
        }
        while self
            .entries
            .front()
            .is_some_and(|(id, _)| id.as_u64() < watermark)
        {
            self.entries.pop_front();
        }
    }
}

impl Default for LogState {
    fn default() -> Self {
        Self::new(LogConfig::default())
    }
}

// ── Tests ───────────────────────────────────────────────────────────
