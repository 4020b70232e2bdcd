use axum::{extract::State, response::Html, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::services::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model_trained: bool,
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        model_trained: state.model.is_trained(),
    })
}

pub async fn index() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html>
<head><title>ETA Tracker</title></head>
<body>
    <h1>ETA Delivery Tracker</h1>
    <p>Delivery time estimation service</p>
    <p><a href="/health">Health Check</a></p>
    <ul>
        <li>POST /predict_eta - Predict delivery time</li>
        <li>POST /train_model - Train the model</li>
        <li>GET /health - Health status</li>
    </ul>
</body>
</html>
"#,
    )
}
