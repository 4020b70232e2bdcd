pub mod eta;
pub mod health;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::EtaError;

/// Maps pipeline errors onto HTTP responses with an `{"error": ...}` body.
pub struct AppError(EtaError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            EtaError::ModelNotTrained => (StatusCode::BAD_REQUEST, self.0.to_string()),
            EtaError::MissingField(_) => {
                (StatusCode::BAD_REQUEST, "missing required fields".to_string())
            }
            EtaError::InvalidCoordinate(detail) => (StatusCode::BAD_REQUEST, detail.clone()),
            EtaError::Storage(detail) => {
                tracing::error!(error = %detail, "Storage failure while serving request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "storage temporarily unavailable".to_string(),
                )
            }
            EtaError::Training(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.0.to_string()),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<EtaError> for AppError {
    fn from(err: EtaError) -> Self {
        Self(err)
    }
}
