//! Trained/untrained lifecycle of the ETA estimator.
//!
//! Readers clone an `Arc` snapshot of the estimator under a short read lock,
//! so a concurrent `train()` can never hand them a half-replaced model.
//! Trainers are serialised by a separate mutex and swap the estimator and its
//! report under one write lock.

use chrono::{Datelike, NaiveDateTime, Timelike};
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::error::{EtaError, EtaResult};
use crate::geo;
use crate::models::route::{features, FeatureVector};
use crate::models::{Coordinate, PredictionResult};
use crate::services::estimator::{mean_absolute_error, ForestParams, RandomForest};
use crate::services::model_store::{ModelArtifact, ModelStore};
use crate::services::proximity;
use crate::services::synth::SynthConfig;

/// Floor applied to every ETA.
pub const MIN_ETA_MINUTES: f64 = 1.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub synth: SynthConfig,
    pub test_ratio: f64,
    pub forest: ForestParams,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            synth: SynthConfig::default(),
            test_ratio: 0.2,
            forest: ForestParams::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub mae: f64,
    pub samples_trained: usize,
    pub test_samples: usize,
    /// Whether the model store accepted the new estimator.
    #[serde(skip)]
    pub persisted: bool,
}

#[derive(Default)]
struct PredictorState {
    estimator: Option<Arc<RandomForest>>,
    report: Option<TrainingReport>,
}

pub struct EtaModel {
    state: RwLock<PredictorState>,
    training: Mutex<()>,
    store: Arc<dyn ModelStore>,
}

impl EtaModel {
    /// A new, untrained model.
    pub fn new(store: Arc<dyn ModelStore>) -> Self {
        Self {
            state: RwLock::new(PredictorState::default()),
            training: Mutex::new(()),
            store,
        }
    }

    /// Restores a previously saved estimator. Returns whether one was loaded.
    ///
    /// Missing or unreadable artifacts leave the model untrained.
    pub fn load_from_store(&self) -> bool {
        match self.store.load() {
            Ok(Some(artifact)) => {
                tracing::info!(
                    trained_at = %artifact.trained_at,
                    mae = artifact.report.mae,
                    trees = artifact.estimator.trees().len(),
                    "Loaded existing model"
                );
                let mut report = artifact.report;
                report.persisted = true;
                let mut state = self.state.write();
                state.estimator = Some(Arc::new(artifact.estimator));
                state.report = Some(report);
                true
            }
            Ok(None) => {
                tracing::info!("No existing model found; train via /train_model");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load model; starting untrained");
                false
            }
        }
    }

    pub fn is_trained(&self) -> bool {
        self.state.read().estimator.is_some()
    }

    pub fn last_report(&self) -> Option<TrainingReport> {
        self.state.read().report.clone()
    }

    /// Synthesises data, fits a fresh estimator and makes it current.
    ///
    /// A store failure is logged and reflected in `persisted`; the new
    /// estimator stays active in memory.
    pub fn train(&self, config: &TrainConfig) -> EtaResult<TrainingReport> {
        let _guard = self.training.lock();
        let started = Instant::now();

        if !(0.0..1.0).contains(&config.test_ratio) {
            return Err(EtaError::Training(format!(
                "test_ratio must be in [0, 1), got {}",
                config.test_ratio
            )));
        }

        tracing::info!(
            samples = config.synth.samples,
            seed = config.synth.seed,
            trees = config.forest.n_trees,
            "Training ETA model"
        );

        let set = config.synth.generate();
        let mut order: Vec<usize> = (0..set.len()).collect();
        order.shuffle(&mut StdRng::seed_from_u64(config.synth.seed));
        let (train, test) = set.split(&order, config.test_ratio);

        let train_x: Vec<FeatureVector> = train.iter().map(|r| r.features()).collect();
        let train_y: Vec<f64> = train.iter().map(|r| r.travel_time_minutes).collect();
        let estimator = RandomForest::fit(&train_x, &train_y, &config.forest)?;

        let mae = if test.is_empty() {
            0.0
        } else {
            let predictions: Vec<f64> = test.iter().map(|r| estimator.predict(&r.features())).collect();
            let targets: Vec<f64> = test.iter().map(|r| r.travel_time_minutes).collect();
            mean_absolute_error(&predictions, &targets)
        };
        if !mae.is_finite() {
            return Err(EtaError::Training(format!("non-finite MAE {}", mae)));
        }

        let mut report = TrainingReport {
            mae,
            samples_trained: set.len(),
            test_samples: test.len(),
            persisted: false,
        };

        let artifact = ModelArtifact::new(estimator, report.clone());
        match self.store.save(&artifact) {
            Ok(()) => report.persisted = true,
            Err(e) => tracing::warn!(error = %e, "Model trained but could not be saved"),
        }

        {
            let mut state = self.state.write();
            state.estimator = Some(Arc::new(artifact.estimator));
            state.report = Some(report.clone());
        }

        tracing::info!(
            mae = report.mae,
            samples_trained = report.samples_trained,
            test_samples = report.test_samples,
            persisted = report.persisted,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Model trained"
        );
        Ok(report)
    }

    /// Predicted travel time in minutes, never below [`MIN_ETA_MINUTES`].
    pub fn predict(
        &self,
        current: Coordinate,
        dropoff: Coordinate,
        at_time: NaiveDateTime,
    ) -> EtaResult<f64> {
        let distance_km = route_distance(current, dropoff)?;
        self.predict_distance(distance_km, at_time)
    }

    /// Prediction plus proximity message, rounded for the response.
    pub fn estimate(
        &self,
        current: Coordinate,
        dropoff: Coordinate,
        at_time: NaiveDateTime,
    ) -> EtaResult<PredictionResult> {
        let distance_km = route_distance(current, dropoff)?;
        let eta = self.predict_distance(distance_km, at_time)?;
        let status = proximity::classify(distance_km, eta);
        Ok(PredictionResult::new(eta, distance_km, status.as_str()))
    }

    fn predict_distance(&self, distance_km: f64, at_time: NaiveDateTime) -> EtaResult<f64> {
        let estimator = self
            .state
            .read()
            .estimator
            .clone()
            .ok_or(EtaError::ModelNotTrained)?;

        if distance_km <= 0.0 {
            return Ok(MIN_ETA_MINUTES);
        }

        let x = features(
            distance_km,
            at_time.hour(),
            at_time.weekday().num_days_from_monday(),
        );
        Ok(estimator.predict(&x).max(MIN_ETA_MINUTES))
    }
}

/// Distance between validated endpoints.
fn route_distance(current: Coordinate, dropoff: Coordinate) -> EtaResult<f64> {
    let current = Coordinate::validated(current.lat, current.lng)?;
    let dropoff = Coordinate::validated(dropoff.lat, dropoff.lng)?;
    Ok(geo::distance(current, dropoff))
}
