use crate::handlers::{scores, stream, ws};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/leaderboards/{quiz_id}", get(scores::get_leaderboard))
        .route("/leaderboards/{quiz_id}/score", post(scores::submit_score))
        .route("/leaderboards/{quiz_id}/stream", get(stream::quiz_stream))
        .route("/leaderboards/all/stream", get(stream::all_quizzes_stream))
        .route("/ws/quiz-sessions/{session_id}", get(ws::session_ws_handler));

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
