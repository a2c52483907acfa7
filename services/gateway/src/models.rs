use serde::{Deserialize, Serialize};
use types::ids::{ParticipantId, QuizId};
use types::score::Score;

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitScoreRequest {
    pub participant_id: ParticipantId,
    pub score: Score,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitScoreResponse {
    pub applied: bool,
}

/// Inbound frame on a quiz session socket.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionScoreSubmission {
    pub quiz_id: QuizId,
    pub participant_id: ParticipantId,
    pub score: Score,
}
