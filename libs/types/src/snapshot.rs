//! Leaderboard snapshot types
//!
//! A snapshot is derived state: recomputed from the ranked store on
//! demand, pushed to subscribers, never persisted. Ranks are 1-based,
//! ordered by descending score with ascending participant id breaking
//! ties.

use crate::ids::{ParticipantId, QuizId};
use crate::score::Score;
use serde::{Deserialize, Serialize};

/// One ranked row of a leaderboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub participant_id: ParticipantId,
    pub score: Score,
}

/// Point-in-time top-K view of a single quiz
///
/// Wire shape matches what streaming clients consume:
/// `{"quiz_id": ..., "leaderboard": [{"rank": 1, ...}, ...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardSnapshot {
    pub quiz_id: QuizId,
    #[serde(rename = "leaderboard")]
    pub entries: Vec<LeaderboardEntry>,
}

impl LeaderboardSnapshot {
    /// Build a snapshot from already-ordered (participant, score) pairs,
    /// assigning 1-based ranks in sequence
    pub fn from_ranked(
        quiz_id: QuizId,
        ranked: impl IntoIterator<Item = (ParticipantId, Score)>,
    ) -> Self {
        let entries = ranked
            .into_iter()
            .enumerate()
            .map(|(i, (participant_id, score))| LeaderboardEntry {
                rank: i as u32 + 1,
                participant_id,
                score,
            })
            .collect();
        Self { quiz_id, entries }
    }

    /// Snapshot with no entries (quiz exists but nobody has scored)
    pub fn empty(quiz_id: QuizId) -> Self {
        Self {
            quiz_id,
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current leader, if anyone has scored
    pub fn leader(&self) -> Option<&LeaderboardEntry> {
        self.entries.first()
    }

    /// Rank held by a participant in this snapshot
    pub fn rank_of(&self, participant_id: ParticipantId) -> Option<u32> {
        self.entries
            .iter()
            .find(|e| e.participant_id == participant_id)
            .map(|e| e.rank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn make_snapshot(scores: &[u64]) -> LeaderboardSnapshot {
        let ranked = scores
            .iter()
            .map(|&s| (ParticipantId::new(), Score::new(s)))
            .collect::<Vec<_>>();
        LeaderboardSnapshot::from_ranked(QuizId::new(), ranked)
    }

    #[test]
    fn test_ranks_are_one_based_and_sequential() {
        let snapshot = make_snapshot(&[70, 60, 50]);
        let ranks: Vec<u32> = snapshot.entries.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn test_leader_is_first_entry() {
        let snapshot = make_snapshot(&[70, 60]);
        let leader = snapshot.leader().unwrap();
        assert_eq!(leader.rank, 1);
        assert_eq!(leader.score, Score::new(70));
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = LeaderboardSnapshot::empty(QuizId::new());
        assert!(snapshot.is_empty());
        assert!(snapshot.leader().is_none());
    }

    #[test]
    fn test_rank_of_present_and_absent() {
        let participant = ParticipantId::new();
        let snapshot = LeaderboardSnapshot::from_ranked(
            QuizId::new(),
            vec![
                (ParticipantId::new(), Score::new(90)),
                (participant, Score::new(40)),
            ],
        );
        assert_eq!(snapshot.rank_of(participant), Some(2));
        assert_eq!(snapshot.rank_of(ParticipantId::new()), None);
    }

    #[test]
    fn test_wire_shape_uses_leaderboard_key() {
        let snapshot = make_snapshot(&[10]);
        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json.get("leaderboard").is_some());
        assert!(json.get("entries").is_none());
        let row = &json["leaderboard"][0];
        assert_eq!(row["rank"], 1);
        assert_eq!(row["score"], 10);
        assert!(row.get("participant_id").is_some());
    }

    proptest! {
        #[test]
        fn prop_ranks_cover_one_to_n(n in 0usize..64) {
            let snapshot = make_snapshot(&vec![5; n]);
            prop_assert_eq!(snapshot.len(), n);
            for (i, entry) in snapshot.entries.iter().enumerate() {
                prop_assert_eq!(entry.rank as usize, i + 1);
            }
        }
    }
}
