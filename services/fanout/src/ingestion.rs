//! Score ingestion for the fan-out pipeline
//!
//! Applies submissions to the ranked store and queues update events
//! for dispatch. The store write is the source of truth: a failed
//! append never fails the submission, it only delays fan-out until
//! the next stale-refresh sweep.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use event_log::{EventId, ScoreEvent, UpdateLog};
use leaderboard::LeaderboardStore;
use tokio::time::Instant;
use tracing::{debug, warn};
use types::ids::{ParticipantId, QuizId};
use types::score::Score;

use crate::catalog::{CatalogError, QuizCatalog};

/// Errors that reject a submission outright.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IngestError {
    #[error("unknown quiz {quiz_id}")]
    UnknownQuiz { quiz_id: QuizId },

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Result of ingesting a single submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Score beat the stored value; an update event is queued.
    Applied(EventId),
    /// Score beat the stored value but the log refused the append.
    /// Subscribers catch up on the next idle sweep.
    AppliedDeferred,
    /// The ratchet kept the existing score; nothing was queued.
    Unchanged,
}

impl IngestOutcome {
    /// Whether the stored score changed.
    pub fn applied(&self) -> bool {
        !matches!(self, IngestOutcome::Unchanged)
    }

    pub fn event_id(&self) -> Option<EventId> {
        match self {
            IngestOutcome::Applied(event_id) => Some(*event_id),
            _ => None,
        }
    }
}

/// Configuration for score ingestion.
#[derive(Debug, Clone, Default)]
pub struct IngestConfig {
    /// Consult the catalog and reject submissions for quizzes it does
    /// not know. Off by default.
    pub require_known_quiz: bool,
}

/// Ingestion layer: validate, ratchet, then queue an update event.
pub struct ScoreIngestion {
    store: Arc<LeaderboardStore>,
    log: Arc<UpdateLog>,
    catalog: Option<Arc<dyn QuizCatalog>>,
    config: IngestConfig,
    epoch: Instant,
    /// Submissions that changed the stored score.
    submissions_applied: AtomicU64,
    /// Submissions the ratchet rejected.
    submissions_unchanged: AtomicU64,
    /// Applied submissions whose event append failed.
    appends_deferred: AtomicU64,
    /// Submissions rejected before reaching the store.
    submissions_rejected: AtomicU64,
}

impl ScoreIngestion {
    pub fn new(
        store: Arc<LeaderboardStore>,
        log: Arc<UpdateLog>,
        catalog: Option<Arc<dyn QuizCatalog>>,
        config: IngestConfig,
    ) -> Self {
        Self {
            store,
            log,
            catalog,
            config,
            epoch: Instant::now(),
            submissions_applied: AtomicU64::new(0),
            submissions_unchanged: AtomicU64::new(0),
            appends_deferred: AtomicU64::new(0),
            submissions_rejected: AtomicU64::new(0),
        }
    }

    /// Ingest a single submission.
    ///
    /// Order matters: the catalog check (when configured) runs first,
    /// then the store ratchet, then the event append. By the time an
    /// event exists the store already holds the new score.
    pub async fn ingest(
        &self,
        quiz_id: QuizId,
        participant_id: ParticipantId,
        score: Score,
    ) -> Result<IngestOutcome, IngestError> {
        if self.config.require_known_quiz {
            if let Some(catalog) = &self.catalog {
                if !catalog.resolve_quiz_exists(quiz_id).await? {
                    self.submissions_rejected.fetch_add(1, Ordering::Relaxed);
                    warn!(%quiz_id, %participant_id, "rejecting submission for unknown quiz");
                    return Err(IngestError::UnknownQuiz { quiz_id });
                }
            }
        }

        if !self.store.submit(quiz_id, participant_id, score) {
            self.submissions_unchanged.fetch_add(1, Ordering::Relaxed);
            debug!(
                %quiz_id,
                %participant_id,
                score = score.as_u64(),
                "ratchet kept existing score"
            );
            return Ok(IngestOutcome::Unchanged);
        }
        self.submissions_applied.fetch_add(1, Ordering::Relaxed);

        let event = ScoreEvent::new(quiz_id, participant_id, score, self.now_nanos());
        match self.log.append(event).await {
            Ok(event_id) => {
                debug!(%quiz_id, %participant_id, %event_id, "queued update event");
                Ok(IngestOutcome::Applied(event_id))
            }
            Err(err) => {
                // The store already holds the new score; the sweep
                // restores subscriber visibility.
                self.appends_deferred.fetch_add(1, Ordering::Relaxed);
                warn!(
                    %quiz_id,
                    %participant_id,
                    error = %err,
                    "update event not queued; fan-out delayed"
                );
                Ok(IngestOutcome::AppliedDeferred)
            }
        }
    }

    /// Submissions that changed the stored score.
    pub fn submissions_applied(&self) -> u64 {
        self.submissions_applied.load(Ordering::Relaxed)
    }

    /// Submissions the ratchet kept unchanged.
    pub fn submissions_unchanged(&self) -> u64 {
        self.submissions_unchanged.load(Ordering::Relaxed)
    }

    /// Applied submissions whose fan-out event was not queued.
    pub fn appends_deferred(&self) -> u64 {
        self.appends_deferred.load(Ordering::Relaxed)
    }

    /// Submissions rejected before reaching the store.
    pub fn submissions_rejected(&self) -> u64 {
        self.submissions_rejected.load(Ordering::Relaxed)
    }

    fn now_nanos(&self) -> i64 {
        self.epoch.elapsed().as_nanos() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use event_log::LogConfig;
    use types::ids::SessionId;
    use uuid::Uuid;

    fn make_quiz(n: u128) -> QuizId {
        QuizId::from_uuid(Uuid::from_u128(n))
    }

    fn make_participant(n: u128) -> ParticipantId {
        ParticipantId::from_uuid(Uuid::from_u128(n))
    }

    fn make_ingestion(config: IngestConfig) -> (ScoreIngestion, Arc<LeaderboardStore>, Arc<UpdateLog>) {
        let store = Arc::new(LeaderboardStore::new());
        let log = Arc::new(UpdateLog::default());
        let ingestion = ScoreIngestion::new(Arc::clone(&store), Arc::clone(&log), None, config);
        (ingestion, store, log)
    }

    struct FixedCatalog {
        exists: bool,
    }

    #[async_trait]
    impl QuizCatalog for FixedCatalog {
        async fn resolve_quiz_exists(&self, _quiz_id: QuizId) -> Result<bool, CatalogError> {
            Ok(self.exists)
        }

        async fn persist_session_score(
            &self,
            _session_id: SessionId,
            _score: Score,
        ) -> Result<(), CatalogError> {
            Ok(())
        }

        async fn query_durable_leaderboard(
            &self,
            _quiz_id: QuizId,
        ) -> Result<Vec<(ParticipantId, Score)>, CatalogError> {
            Ok(Vec::new())
        }
    }

    struct BrokenCatalog;

    #[async_trait]
    impl QuizCatalog for BrokenCatalog {
        async fn resolve_quiz_exists(&self, _quiz_id: QuizId) -> Result<bool, CatalogError> {
            Err(CatalogError("connection refused".to_string()))
        }

        async fn persist_session_score(
            &self,
            _session_id: SessionId,
            _score: Score,
        ) -> Result<(), CatalogError> {
            Err(CatalogError("connection refused".to_string()))
        }

        async fn query_durable_leaderboard(
            &self,
            _quiz_id: QuizId,
        ) -> Result<Vec<(ParticipantId, Score)>, CatalogError> {
            Err(CatalogError("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_applied_submission_queues_event() {
        let (ingestion, store, log) = make_ingestion(IngestConfig::default());
        let quiz = make_quiz(1);
        let alice = make_participant(1);

        let outcome = ingestion.ingest(quiz, alice, Score::new(50)).await.unwrap();

        assert_eq!(outcome, IngestOutcome::Applied(EventId::new(1)));
        assert!(outcome.applied());
        assert_eq!(store.score_of(quiz, alice), Some(Score::new(50)));
        assert_eq!(log.retained_len().await, 1);
        assert_eq!(ingestion.submissions_applied(), 1);
    }

    #[tokio::test]
    async fn test_noop_submission_queues_nothing() {
        let (ingestion, store, log) = make_ingestion(IngestConfig::default());
        let quiz = make_quiz(1);
        let alice = make_participant(1);

        ingestion.ingest(quiz, alice, Score::new(50)).await.unwrap();
        let outcome = ingestion.ingest(quiz, alice, Score::new(40)).await.unwrap();

        assert_eq!(outcome, IngestOutcome::Unchanged);
        assert!(!outcome.applied());
        assert!(outcome.event_id().is_none());
        assert_eq!(store.score_of(quiz, alice), Some(Score::new(50)));
        // Only the first submission produced an event.
        assert_eq!(log.retained_len().await, 1);
        assert_eq!(ingestion.submissions_unchanged(), 1);
    }

    #[tokio::test]
    async fn test_equal_score_is_noop() {
        let (ingestion, _store, log) = make_ingestion(IngestConfig::default());
        let quiz = make_quiz(1);
        let alice = make_participant(1);

        ingestion.ingest(quiz, alice, Score::new(50)).await.unwrap();
        let outcome = ingestion.ingest(quiz, alice, Score::new(50)).await.unwrap();

        assert_eq!(outcome, IngestOutcome::Unchanged);
        assert_eq!(log.retained_len().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_quiz_rejected_when_required() {
        let store = Arc::new(LeaderboardStore::new());
        let log = Arc::new(UpdateLog::default());
        let ingestion = ScoreIngestion::new(
            Arc::clone(&store),
            Arc::clone(&log),
            Some(Arc::new(FixedCatalog { exists: false })),
            IngestConfig {
                require_known_quiz: true,
            },
        );
        let quiz = make_quiz(9);

        let err = ingestion
            .ingest(quiz, make_participant(1), Score::new(10))
            .await
            .unwrap_err();

        assert_eq!(err, IngestError::UnknownQuiz { quiz_id: quiz });
        assert_eq!(store.quiz_count(), 0);
        assert_eq!(log.retained_len().await, 0);
        assert_eq!(ingestion.submissions_rejected(), 1);
    }

    #[tokio::test]
    async fn test_known_quiz_accepted_when_required() {
        let store = Arc::new(LeaderboardStore::new());
        let log = Arc::new(UpdateLog::default());
        let ingestion = ScoreIngestion::new(
            Arc::clone(&store),
            Arc::clone(&log),
            Some(Arc::new(FixedCatalog { exists: true })),
            IngestConfig {
                require_known_quiz: true,
            },
        );

        let outcome = ingestion
            .ingest(make_quiz(1), make_participant(1), Score::new(10))
            .await
            .unwrap();
        assert!(outcome.applied());
    }

    #[tokio::test]
    async fn test_catalog_failure_propagates() {
        let store = Arc::new(LeaderboardStore::new());
        let log = Arc::new(UpdateLog::default());
        let ingestion = ScoreIngestion::new(
            Arc::clone(&store),
            Arc::clone(&log),
            Some(Arc::new(BrokenCatalog)),
            IngestConfig {
                require_known_quiz: true,
            },
        );

        let err = ingestion
            .ingest(make_quiz(1), make_participant(1), Score::new(10))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Catalog(_)));
        assert_eq!(store.quiz_count(), 0);
    }

    #[tokio::test]
    async fn test_catalog_skipped_when_not_required() {
        let store = Arc::new(LeaderboardStore::new());
        let log = Arc::new(UpdateLog::default());
        // A broken catalog is harmless while the check is off.
        let ingestion = ScoreIngestion::new(
            Arc::clone(&store),
            Arc::clone(&log),
            Some(Arc::new(BrokenCatalog)),
            IngestConfig::default(),
        );

        let outcome = ingestion
            .ingest(make_quiz(1), make_participant(1), Score::new(10))
            .await
            .unwrap();
        assert!(outcome.applied());
    }

    #[tokio::test]
    async fn test_append_failure_defers_fanout_but_applies_score() {
        let store = Arc::new(LeaderboardStore::new());
        let log = Arc::new(UpdateLog::new(LogConfig {
            max_backlog: 1,
            ..LogConfig::default()
        }));
        let ingestion = ScoreIngestion::new(
            Arc::clone(&store),
            Arc::clone(&log),
            None,
            IngestConfig::default(),
        );
        let quiz = make_quiz(1);

        // Fill the single-entry backlog.
        ingestion
            .ingest(quiz, make_participant(1), Score::new(10))
            .await
            .unwrap();

        let outcome = ingestion
            .ingest(quiz, make_participant(2), Score::new(20))
            .await
            .unwrap();

        assert_eq!(outcome, IngestOutcome::AppliedDeferred);
        assert!(outcome.applied());
        // The store took the write even though no event was queued.
        assert_eq!(
            store.score_of(quiz, make_participant(2)),
            Some(Score::new(20))
        );
        assert_eq!(log.retained_len().await, 1);
        assert_eq!(ingestion.appends_deferred(), 1);
    }
}
