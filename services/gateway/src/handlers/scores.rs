use crate::error::AppError;
use crate::models::{SubmitScoreRequest, SubmitScoreResponse};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use tracing::{debug, warn};
use types::ids::QuizId;
use types::snapshot::LeaderboardSnapshot;

pub async fn submit_score(
    State(state): State<AppState>,
    Path(quiz_id): Path<QuizId>,
    Json(payload): Json<SubmitScoreRequest>,
) -> Result<Json<SubmitScoreResponse>, AppError> {
    // Validation, the ratchet and the event append all live behind
    // ingest; the handler only maps the outcome onto the wire.
    let outcome = state
        .ingestion
        .ingest(quiz_id, payload.participant_id, payload.score)
        .await?;

    Ok(Json(SubmitScoreResponse {
        applied: outcome.applied(),
    }))
}

pub async fn get_leaderboard(
    State(state): State<AppState>,
    Path(quiz_id): Path<QuizId>,
) -> Json<LeaderboardSnapshot> {
    if state.config.seed_on_cold_start && state.store.participant_count(quiz_id) == 0 {
        seed_from_catalog(&state, quiz_id).await;
    }

    Json(state.store.snapshot(quiz_id))
}

/// Backfill an empty live board from the catalog's durable ranking.
///
/// Best effort: a catalog failure serves whatever live state exists
/// rather than failing the read.
async fn seed_from_catalog(state: &AppState, quiz_id: QuizId) {
    let Some(catalog) = &state.catalog else {
        return;
    };

    match catalog.query_durable_leaderboard(quiz_id).await {
        Ok(rows) if rows.is_empty() => {}
        Ok(rows) => {
            let seeded = state.store.seed(quiz_id, rows);
            debug!(%quiz_id, seeded, "seeded live board from durable ranking");
        }
        Err(err) => {
            warn!(%quiz_id, error = %err, "cold-start seed failed, serving live state");
        }
    }
}
