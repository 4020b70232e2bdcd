pub mod config;
pub mod error;
pub mod geo;
pub mod handlers;
pub mod logger;
pub mod models;
pub mod services;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use error::{EtaError, EtaResult};
pub use services::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::health::index))
        .route("/health", get(handlers::health::health_check))
        .route("/train_model", post(handlers::eta::train_model))
        .route("/predict_eta", post(handlers::eta::predict_eta))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
