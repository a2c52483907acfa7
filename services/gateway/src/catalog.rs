use async_trait::async_trait;
use fanout::{CatalogError, QuizCatalog};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use types::ids::{ParticipantId, QuizId, SessionId};
use types::score::Score;

/// HTTP client for the quiz catalog service.
///
/// The catalog owns quiz registration and durable session results; the
/// gateway reads quiz existence and historical rankings from it and
/// writes session scores back.
pub struct HttpCatalog {
    client: Client,
    base_url: String,
}

impl HttpCatalog {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DurableScoreRow {
    participant_id: ParticipantId,
    score: Score,
}

#[async_trait]
impl QuizCatalog for HttpCatalog {
    async fn resolve_quiz_exists(&self, quiz_id: QuizId) -> Result<bool, CatalogError> {
        let url = format!("{}/api/v1/quizzes/{}", self.base_url, quiz_id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CatalogError(format!("quiz lookup failed: {}", e)))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(CatalogError(format!("quiz lookup returned {}", status))),
        }
    }

    async fn persist_session_score(
        &self,
        session_id: SessionId,
        score: Score,
    ) -> Result<(), CatalogError> {
        let url = format!("{}/api/v1/quiz-sessions/{}/score", self.base_url, session_id);
        let response = self
            .client
            .patch(&url)
            .json(&json!({ "score": score }))
            .send()
            .await
            .map_err(|e| CatalogError(format!("session score persist failed: {}", e)))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CatalogError(format!(
                "session score persist returned {}",
                response.status()
            )))
        }
    }

    async fn query_durable_leaderboard(
        &self,
        quiz_id: QuizId,
    ) -> Result<Vec<(ParticipantId, Score)>, CatalogError> {
        let url = format!("{}/api/v1/quizzes/{}/scores", self.base_url, quiz_id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CatalogError(format!("durable ranking query failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(CatalogError(format!(
                "durable ranking query returned {}",
                response.status()
            )));
        }

        let rows: Vec<DurableScoreRow> = response
            .json()
            .await
            .map_err(|e| CatalogError(format!("durable ranking decode failed: {}", e)))?;

        Ok(rows
            .into_iter()
            .map(|row| (row.participant_id, row.score))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durable_rows_parse_catalog_wire_shape() {
        let raw = r#"[
            {"participant_id": "018f4e8a-2f7b-7c3e-9a4d-1b2c3d4e5f60", "score": 70},
            {"participant_id": "018f4e8a-2f7b-7c3e-9a4d-1b2c3d4e5f61", "score": 55}
        ]"#;
        let rows: Vec<DurableScoreRow> = serde_json::from_str(raw).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].score, Score::new(70));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let catalog = HttpCatalog::new("http://catalog:8000/".to_string());
        assert_eq!(catalog.base_url, "http://catalog:8000");
    }
}
