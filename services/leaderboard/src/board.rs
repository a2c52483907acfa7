//! In-memory ranked board for a single quiz
//!
//! Maintains participant scores under the monotonic ratchet and a
//! sorted index for top-K reads. Uses `BTreeSet` for deterministic
//! sorted iteration.
//!
//! The board processes:
//! - `submit` → apply a score iff strictly greater than the stored one
//! - `top` → walk the ranked index, best first
//!
//! Equal scores order by ascending participant id, so a ranking is
//! reproducible across restarts and processes.

use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};

use types::ids::ParticipantId;
use types::score::Score;

/// Ranked scores for one quiz.
///
/// Two views of the same data: `scores` answers point lookups,
/// `ranked` keeps (score desc, participant asc) order for top-K walks.
/// Every mutation updates both, so they never disagree.
#[derive(Debug, Clone, Default)]
pub struct Board {
    /// Best score seen per participant.
    scores: HashMap<ParticipantId, Score>,
    /// Sorted index: highest score first, lower participant id first on ties.
    ranked: BTreeSet<(Reverse<Score>, ParticipantId)>,
}

impl Board {
    /// Create an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a score iff it strictly beats the participant's stored score.
    ///
    /// Returns whether the board changed. Equal or lower scores are a
    /// no-op, not an error; resubmission is always safe.
    pub fn submit(&mut self, participant_id: ParticipantId, score: Score) -> bool {
        if let Some(&current) = self.scores.get(&participant_id) {
            if score <= current {
                return false;
            }
            self.ranked.remove(&(Reverse(current), participant_id));
        }
        self.scores.insert(participant_id, score);
        self.ranked.insert((Reverse(score), participant_id));
        true
    }

    /// Best score stored for a participant, if any.
    pub fn score_of(&self, participant_id: ParticipantId) -> Option<Score> {
        self.scores.get(&participant_id).copied()
    }

    /// Up to `k` highest-scoring participants, best first.
    pub fn top(&self, k: usize) -> Vec<(ParticipantId, Score)> {
        self.ranked
            .iter()
            .take(k)
            .map(|&(Reverse(score), participant_id)| (participant_id, score))
            .collect()
    }

    /// Number of participants with a stored score.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}
