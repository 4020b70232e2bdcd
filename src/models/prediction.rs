use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Response record for a prediction, also the cached value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub eta_minutes: f64,
    pub distance_km: f64,
    pub message: String,
    pub timestamp: DateTime<Local>,
}

impl PredictionResult {
    pub fn new(eta_minutes: f64, distance_km: f64, message: impl Into<String>) -> Self {
        Self {
            eta_minutes: round2(eta_minutes),
            distance_km: round2(distance_km),
            message: message.into(),
            timestamp: Local::now(),
        }
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
