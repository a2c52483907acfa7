//! Score event definitions
//!
//! A [`ScoreEvent`] records one accepted ratchet update. Events are
//! immutable once appended; consumers see them read-only, in append
//! order, keyed by the log position the append assigned.

use serde::{Deserialize, Serialize};
use types::ids::{ParticipantId, QuizId};
use types::score::Score;

/// Log position of an appended event.
///
/// Assigned contiguously by the log, starting at 1. Ordering by id is
/// append order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(u64);

impl EventId {
    pub fn new(position: u64) -> Self {
        Self(position)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One accepted score update, as fanned out to consumers.
///
/// Carries the score that was applied, not a delta; the ranked store
/// has already been updated by the time an event is appended, so a
/// consumer reading this event sees the store at this score or higher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEvent {
    pub quiz_id: QuizId,
    pub participant_id: ParticipantId,
    pub score: Score,
    /// Producer-assigned nanosecond timestamp, monotonic per producer
    pub enqueued_at: i64,
}

impl ScoreEvent {
    pub fn new(
        quiz_id: QuizId,
        participant_id: ParticipantId,
        score: Score,
        enqueued_at: i64,
    ) -> Self {
        Self {
            quiz_id,
            participant_id,
            score,
            enqueued_at,
        }
    }
}
