//! Catalog collaborator interface
//!
//! Quizzes, sessions, and durable scores live in a separate catalog
//! service. The pipeline reaches it through this trait so the hot
//! path runs without it and tests substitute an in-process fake.

use async_trait::async_trait;
use types::ids::{ParticipantId, QuizId, SessionId};
use types::score::Score;

/// Failure while talking to the quiz catalog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("catalog request failed: {0}")]
pub struct CatalogError(pub String);

/// Narrow client interface onto the external quiz catalog.
#[async_trait]
pub trait QuizCatalog: Send + Sync {
    /// Whether the quiz exists in the catalog.
    async fn resolve_quiz_exists(&self, quiz_id: QuizId) -> Result<bool, CatalogError>;

    /// Persist a session's score durably. The realtime path calls
    /// this before the live ratchet (durable first, then visible).
    async fn persist_session_score(
        &self,
        session_id: SessionId,
        score: Score,
    ) -> Result<(), CatalogError>;

    /// Durable ranking for a quiz, best first. Used to seed a live
    /// board on cold start.
    async fn query_durable_leaderboard(
        &self,
        quiz_id: QuizId,
    ) -> Result<Vec<(ParticipantId, Score)>, CatalogError>;
}
