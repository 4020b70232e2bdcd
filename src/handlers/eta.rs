use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Local;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::AppError;
use crate::error::{EtaError, EtaResult};
use crate::models::{Coordinate, PredictionResult};
use crate::services::cache::CacheKey;
use crate::services::predictor::TrainingReport;
use crate::services::AppState;

pub const REQUIRED_FIELDS: [&str; 4] = ["current_lat", "current_lng", "dropoff_lat", "dropoff_lng"];

#[derive(Serialize)]
pub struct TrainResponse {
    pub success: bool,
    pub message: String,
    pub results: TrainingReport,
}

/// Validated body of a predict request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictRequest {
    pub current: Coordinate,
    pub dropoff: Coordinate,
}

impl PredictRequest {
    /// Every field must be present before any value is checked.
    pub fn from_json(body: &Value) -> EtaResult<Self> {
        let missing: Vec<&str> = REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|field| body.get(field).map_or(true, Value::is_null))
            .collect();
        if !missing.is_empty() {
            return Err(EtaError::MissingField(missing.join(", ")));
        }

        let number = |field: &str| -> EtaResult<f64> {
            body[field].as_f64().ok_or_else(|| {
                EtaError::InvalidCoordinate(format!("{} must be a numeric value", field))
            })
        };

        Ok(Self {
            current: Coordinate::validated(number("current_lat")?, number("current_lng")?)?,
            dropoff: Coordinate::validated(number("dropoff_lat")?, number("dropoff_lng")?)?,
        })
    }
}

pub async fn train_model(State(state): State<Arc<AppState>>) -> Response {
    let model = state.model.clone();
    let config = state.train_config.clone();

    let outcome = tokio::task::spawn_blocking(move || model.train(&config))
        .await
        .unwrap_or_else(|e| Err(EtaError::Training(format!("training task aborted: {}", e))));

    match outcome {
        Ok(results) => Json(TrainResponse {
            success: true,
            message: "Model trained successfully".to_string(),
            results,
        })
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Training request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

pub async fn predict_eta(
    State(state): State<Arc<AppState>>,
    body: Option<Json<Value>>,
) -> Result<Json<PredictionResult>, AppError> {
    let body = body.map(|Json(v)| v).unwrap_or(Value::Null);

    if !state.model.is_trained() {
        return Err(EtaError::ModelNotTrained.into());
    }
    let request = PredictRequest::from_json(&body)?;
    let key = CacheKey::from_coordinates(request.current, request.dropoff);

    match state.cache.get(&key).await {
        Ok(Some(hit)) => {
            tracing::debug!(key = %key, "Serving cached prediction");
            return Ok(Json(hit));
        }
        Ok(None) => {}
        Err(e) => tracing::warn!(key = %key, error = %e, "Cache read failed; recomputing"),
    }

    let result = state
        .model
        .estimate(request.current, request.dropoff, Local::now().naive_local())?;

    state.cache.put(&key, &result, state.cache_ttl).await?;

    Ok(Json(result))
}
