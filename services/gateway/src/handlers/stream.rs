use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use std::convert::Infallible;
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use tracing::warn;
use types::ids::QuizId;
use types::snapshot::LeaderboardSnapshot;

/// SSE stream of one quiz's leaderboard.
///
/// Emits the current state immediately, then every published update
/// for that quiz. Subscribes before the initial read so an update
/// landing between the two is never dropped.
pub async fn quiz_stream(
    State(state): State<AppState>,
    Path(quiz_id): Path<QuizId>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.hub.subscribe();
    let initial = snapshot_event(&state.store.snapshot(quiz_id)).map(Ok::<Event, Infallible>);

    let live = BroadcastStream::new(receiver).filter_map(move |item| match item {
        Ok(snapshot) if snapshot.quiz_id == quiz_id => {
            snapshot_event(snapshot.as_ref()).map(Ok)
        }
        Ok(_) => None,
        Err(err) => {
            warn!("leaderboard broadcast error: {err}");
            None
        }
    });

    Sse::new(tokio_stream::iter(initial).chain(live)).keep_alive(KeepAlive::default())
}

/// SSE stream of every quiz's leaderboard.
///
/// Starts with one frame per live board in ascending quiz id order,
/// then forwards all published updates unfiltered.
pub async fn all_quizzes_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.hub.subscribe();

    let mut quiz_ids = state.store.quiz_ids();
    quiz_ids.sort();
    let initial: Vec<Result<Event, Infallible>> = quiz_ids
        .into_iter()
        .filter_map(|quiz_id| snapshot_event(&state.store.snapshot(quiz_id)))
        .map(Ok)
        .collect();

    let live = BroadcastStream::new(receiver).filter_map(|item| match item {
        Ok(snapshot) => snapshot_event(snapshot.as_ref()).map(Ok),
        Err(err) => {
            warn!("leaderboard broadcast error: {err}");
            None
        }
    });

    Sse::new(tokio_stream::iter(initial).chain(live)).keep_alive(KeepAlive::default())
}

fn snapshot_event(snapshot: &LeaderboardSnapshot) -> Option<Event> {
    match serde_json::to_string(snapshot) {
        Ok(payload) => Some(Event::default().data(payload)),
        Err(err) => {
            warn!("failed to serialize leaderboard snapshot: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::ids::ParticipantId;
    use types::score::Score;

    #[test]
    fn snapshot_event_carries_wire_payload() {
        let snapshot = LeaderboardSnapshot::from_ranked(
            QuizId::new(),
            vec![(ParticipantId::new(), Score::new(70))],
        );
        let event = snapshot_event(&snapshot);
        assert!(event.is_some());
    }
}
