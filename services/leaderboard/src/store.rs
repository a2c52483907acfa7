//! Concurrent store of ranked boards, one per quiz
//!
//! The store shards by quiz: a submission locks only its quiz's board,
//! so load on one quiz never stalls another. Top-K reads see a
//! consistent point-in-time view of their board while other quizzes
//! keep mutating.

use dashmap::DashMap;

use types::ids::{ParticipantId, QuizId};
use types::score::Score;
use types::snapshot::LeaderboardSnapshot;

use crate::board::Board;

/// Default number of entries returned by [`LeaderboardStore::snapshot`].
pub const DEFAULT_TOP_K: usize = 10;

/// All live leaderboards, keyed by quiz.
///
/// Shared across ingestion, fan-out and query paths behind an `Arc`.
/// Mutation is confined to `submit`, `seed` and `remove_quiz`.
#[derive(Debug)]
pub struct LeaderboardStore {
    boards: DashMap<QuizId, Board>,
    top_k: usize,
}

impl LeaderboardStore {
    /// Create an empty store with the default top-K.
    pub fn new() -> Self {
        Self::with_top_k(DEFAULT_TOP_K)
    }

    /// Create an empty store with an explicit top-K for snapshots.
    pub fn with_top_k(top_k: usize) -> Self {
        Self {
            boards: DashMap::new(),
            top_k,
        }
    }

    /// Apply a score through the ratchet.
    ///
    /// Creates the quiz's board on first submission. Returns whether
    /// the store changed (`false` for an equal-or-lower score).
    pub fn submit(&self, quiz_id: QuizId, participant_id: ParticipantId, score: Score) -> bool {
        self.boards
            .entry(quiz_id)
            .or_default()
            .submit(participant_id, score)
    }

    /// Up to `k` highest-scoring participants for a quiz.
    ///
    /// Unknown quizzes yield an empty snapshot rather than an error;
    /// to callers a quiz nobody has scored on and a quiz that does not
    /// exist look the same.
    pub fn top(&self, quiz_id: QuizId, k: usize) -> LeaderboardSnapshot {
        match self.boards.get(&quiz_id) {
            Some(board) => LeaderboardSnapshot::from_ranked(quiz_id, board.top(k)),
            None => LeaderboardSnapshot::empty(quiz_id),
        }
    }

    /// Top-K snapshot using the store's configured K.
    pub fn snapshot(&self, quiz_id: QuizId) -> LeaderboardSnapshot {
        self.top(quiz_id, self.top_k)
    }

    /// Best score stored for a participant on a quiz.
    pub fn score_of(&self, quiz_id: QuizId, participant_id: ParticipantId) -> Option<Score> {
        self.boards
            .get(&quiz_id)
            .and_then(|board| board.score_of(participant_id))
    }

    /// All quizzes that currently have a board.
    ///
    /// Drives the stale-refresh sweep; order is unspecified.
    pub fn quiz_ids(&self) -> Vec<QuizId> {
        self.boards.iter().map(|entry| *entry.key()).collect()
    }

    /// Import a durable ranking, e.g. on cold start.
    ///
    /// Every entry goes through the ratchet, so a live submission that
    /// raced ahead of the import is never regressed. Returns how many
    /// entries changed the board.
    pub fn seed(
        &self,
        quiz_id: QuizId,
        entries: impl IntoIterator<Item = (ParticipantId, Score)>,
    ) -> usize {
        let mut board = self.boards.entry(quiz_id).or_default();
        entries
            .into_iter()
            .filter(|&(participant_id, score)| board.submit(participant_id, score))
            .count()
    }

    /// Drop a quiz's board entirely (explicit teardown).
    pub fn remove_quiz(&self, quiz_id: QuizId) -> bool {
        self.boards.remove(&quiz_id).is_some()
    }

    /// Number of participants with a stored score on a quiz.
    pub fn participant_count(&self, quiz_id: QuizId) -> usize {
        self.boards.get(&quiz_id).map_or(0, |board| board.len())
    }

    /// Number of quizzes with a live board.
    pub fn quiz_count(&self) -> usize {
        self.boards.len()
    }

    /// Configured top-K for snapshots.
    pub fn top_k(&self) -> usize {
        self.top_k
    }
}

impl Default for LeaderboardStore {
    fn default() -> Self {
        Self::new()
    }
}
