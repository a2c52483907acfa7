use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fanout::IngestError;
use serde_json::json;
use thiserror::Error;

/// Central error type for the gateway surface
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::UnknownQuiz { quiz_id } => {
                AppError::NotFound(format!("quiz {} is not registered", quiz_id))
            }
            IngestError::Catalog(err) => {
                tracing::warn!(error = %err, "catalog lookup failed during submission");
                AppError::ServiceUnavailable("quiz catalog unreachable".to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, code) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, "NOT_FOUND"),
            AppError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                msg,
                "SERVICE_UNAVAILABLE",
            ),
        };

        let body = Json(json!({
            "error": code,
            "message": error_message
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fanout::CatalogError;
    use types::ids::QuizId;

    #[test]
    fn unknown_quiz_maps_to_not_found() {
        let err = AppError::from(IngestError::UnknownQuiz {
            quiz_id: QuizId::new(),
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn catalog_outage_maps_to_service_unavailable() {
        let err = AppError::from(IngestError::Catalog(CatalogError(
            "connection refused".to_string(),
        )));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
