use crate::models::SessionScoreSubmission;
use crate::state::AppState;
use axum::{
    extract::{
        ws::{Message, Utf8Bytes, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use fanout::IngestError;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use types::ids::{ConnectionId, SessionId};

pub async fn session_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
) -> Response {
    ws.on_upgrade(move |socket| handle_session(socket, state, session_id))
}

/// Drive one quiz session connection until either side closes.
async fn handle_session(socket: WebSocket, state: AppState, session_id: SessionId) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Arc<str>>(state.config.ws_queue_capacity);

    // Session sockets receive every quiz's updates, so no filter.
    let connection_id = state.registry.register(tx, None);
    info!(%session_id, %connection_id, "quiz session connected");

    // Outgoing half: drain queued payloads into the socket.
    tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            let frame = Message::Text(Utf8Bytes::from(payload.as_ref()));
            if ws_sender.send(frame).await.is_err() {
                break;
            }
        }
    });

    // Incoming half: score submissions from the running session.
    while let Some(message) = ws_receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                handle_submission(&state, session_id, connection_id, text.as_str()).await;
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                warn!(%session_id, error = %err, "quiz session socket error");
                break;
            }
        }
    }

    // Unregistering drops the outbound sender, which closes the
    // channel and ends the writer task.
    state.registry.unregister(connection_id);
    info!(%session_id, %connection_id, "quiz session disconnected");
}

async fn handle_submission(
    state: &AppState,
    session_id: SessionId,
    connection_id: ConnectionId,
    text: &str,
) {
    let submission: SessionScoreSubmission = match serde_json::from_str(text) {
        Ok(submission) => submission,
        Err(err) => {
            reply(
                state,
                connection_id,
                json!({ "error": "BAD_FRAME", "message": err.to_string() }),
            );
            return;
        }
    };

    // Durable result first, live board second. A catalog outage must
    // not stall the running quiz.
    if let Some(catalog) = &state.catalog {
        if let Err(err) = catalog.persist_session_score(session_id, submission.score).await {
            warn!(%session_id, error = %err, "session score persist failed, live update continues");
        }
    }

    match state
        .ingestion
        .ingest(submission.quiz_id, submission.participant_id, submission.score)
        .await
    {
        Ok(outcome) => {
            reply(
                state,
                connection_id,
                json!({ "applied": outcome.applied() }),
            );
        }
        Err(err @ IngestError::UnknownQuiz { .. }) => {
            reply(
                state,
                connection_id,
                json!({ "error": "UNKNOWN_QUIZ", "message": err.to_string() }),
            );
        }
        Err(err @ IngestError::Catalog(_)) => {
            warn!(%session_id, error = %err, "submission dropped, catalog unreachable");
            reply(
                state,
                connection_id,
                json!({ "error": "SERVICE_UNAVAILABLE", "message": "submission not accepted" }),
            );
        }
    }
}

/// Queue a personal frame on the connection's outbound channel.
fn reply(state: &AppState, connection_id: ConnectionId, frame: serde_json::Value) {
    state
        .registry
        .send_to(connection_id, Arc::from(frame.to_string()));
}
