//! Tests for the model lifecycle: training, prediction, persistence and
//! concurrent access.

use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Arc;
use std::thread;

use etacast::error::EtaError;
use etacast::models::{BoundingBox, Coordinate};
use etacast::services::estimator::ForestParams;
use etacast::services::model_store::{FileModelStore, MemoryModelStore, ModelStore};
use etacast::services::predictor::{EtaModel, TrainConfig, MIN_ETA_MINUTES};
use etacast::services::synth::SynthConfig;

fn config(samples: usize, n_trees: usize) -> TrainConfig {
    TrainConfig {
        synth: SynthConfig {
            samples,
            bounds: BoundingBox::new((14.5, 14.7), (120.9, 121.1)),
            seed: 42,
        },
        forest: ForestParams {
            n_trees,
            ..ForestParams::default()
        },
        ..TrainConfig::default()
    }
}

fn at(hour: u32, day: u32) -> NaiveDateTime {
    // January 2024 starts on a Monday.
    NaiveDate::from_ymd_opt(2024, 1, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

#[test]
fn test_train_scenario_thousand_routes() {
    let model = EtaModel::new(Arc::new(MemoryModelStore::new()));
    let report = model.train(&config(1000, 20)).unwrap();

    assert_eq!(report.samples_trained, 1000);
    assert_eq!(report.test_samples, 200);
    assert!(report.mae.is_finite());
    assert!(report.mae >= 0.0);
    // Noise alone has std 2; a working fit stays well under the spread of targets.
    assert!(report.mae < 10.0, "mae {}", report.mae);
}

#[test]
fn test_training_is_reproducible() {
    let a = EtaModel::new(Arc::new(MemoryModelStore::new()));
    let b = EtaModel::new(Arc::new(MemoryModelStore::new()));
    let ra = a.train(&config(400, 8)).unwrap();
    let rb = b.train(&config(400, 8)).unwrap();
    assert_eq!(ra.mae, rb.mae);

    let from = Coordinate::new(14.52, 120.95);
    let to = Coordinate::new(14.68, 121.07);
    assert_eq!(
        a.predict(from, to, at(8, 2)).unwrap(),
        b.predict(from, to, at(8, 2)).unwrap()
    );
}

#[test]
fn test_predict_untrained_fails() {
    let model = EtaModel::new(Arc::new(MemoryModelStore::new()));
    let p = Coordinate::new(14.6, 121.0);
    let q = Coordinate::new(14.65, 121.05);
    assert!(matches!(model.predict(p, q, at(12, 3)), Err(EtaError::ModelNotTrained)));
    assert!(matches!(model.estimate(p, q, at(12, 3)), Err(EtaError::ModelNotTrained)));
}

#[test]
fn test_identical_coordinates_scenario() {
    let model = EtaModel::new(Arc::new(MemoryModelStore::new()));
    model.train(&config(300, 5)).unwrap();

    let p = Coordinate::new(14.5995, 120.9842);
    let result = model.estimate(p, p, at(18, 4)).unwrap();
    assert_eq!(result.distance_km, 0.0);
    assert_eq!(result.eta_minutes, 1.0);
    assert_eq!(result.message, "arriving very soon");
}

#[test]
fn test_eta_never_below_floor() {
    let model = EtaModel::new(Arc::new(MemoryModelStore::new()));
    model.train(&config(300, 5)).unwrap();

    let origin = Coordinate::new(14.6, 121.0);
    for step in 0..20 {
        let dest = Coordinate::new(14.6 + step as f64 * 0.0005, 121.0);
        for hour in [3, 8, 13, 18, 23] {
            let eta = model.predict(origin, dest, at(hour, 6)).unwrap();
            assert!(eta >= MIN_ETA_MINUTES, "eta {} at step {}", eta, step);
        }
    }
}

#[test]
fn test_rush_hour_slower_than_midday() {
    let model = EtaModel::new(Arc::new(MemoryModelStore::new()));
    model.train(&config(1000, 20)).unwrap();

    let from = Coordinate::new(14.55, 121.0);
    let to = Coordinate::new(14.62, 121.05);
    let rush = model.predict(from, to, at(8, 3)).unwrap();
    let midday = model.predict(from, to, at(13, 3)).unwrap();
    assert!(rush > midday, "rush {} vs midday {}", rush, midday);
}

#[test]
fn test_retrain_replaces_estimator() {
    let model = EtaModel::new(Arc::new(MemoryModelStore::new()));
    let first = model.train(&config(200, 3)).unwrap();
    let second = model.train(&config(500, 3)).unwrap();

    assert_eq!(first.samples_trained, 200);
    assert_eq!(second.samples_trained, 500);
    assert_eq!(model.last_report().unwrap().samples_trained, 500);
}

#[test]
fn test_save_failure_keeps_trained_state() {
    let store = Arc::new(MemoryModelStore::new());
    store.set_failing(true);
    let model = EtaModel::new(store.clone());

    let report = model.train(&config(200, 3)).unwrap();
    assert!(!report.persisted);
    assert!(model.is_trained());
    assert!(!store.has_artifact());
}

#[test]
fn test_failed_training_keeps_previous_model() {
    let model = EtaModel::new(Arc::new(MemoryModelStore::new()));
    model.train(&config(200, 3)).unwrap();

    let err = model.train(&config(0, 3)).unwrap_err();
    assert!(matches!(err, EtaError::Training(_)));
    assert!(model.is_trained());
    assert_eq!(model.last_report().unwrap().samples_trained, 200);
}

#[test]
fn test_file_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("models").join("eta.bin");

    let from = Coordinate::new(14.55, 121.02);
    let to = Coordinate::new(14.62, 121.06);

    let before = {
        let model = EtaModel::new(Arc::new(FileModelStore::new(&path)));
        let report = model.train(&config(300, 5)).unwrap();
        assert!(report.persisted);
        model.predict(from, to, at(10, 5)).unwrap()
    };
    assert!(path.exists());

    let restarted = EtaModel::new(Arc::new(FileModelStore::new(&path)));
    assert!(!restarted.is_trained());
    assert!(restarted.load_from_store());
    assert!(restarted.is_trained());
    assert_eq!(restarted.predict(from, to, at(10, 5)).unwrap(), before);
    assert_eq!(restarted.last_report().unwrap().test_samples, 60);
}

#[test]
fn test_missing_artifact_leaves_untrained() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileModelStore::new(dir.path().join("absent.bin"));
    assert!(store.load().unwrap().is_none());

    let model = EtaModel::new(Arc::new(store));
    assert!(!model.load_from_store());
    assert!(!model.is_trained());
}

#[test]
fn test_corrupt_artifact_leaves_untrained() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.bin");
    std::fs::write(&path, b"not a model").unwrap();

    let store = FileModelStore::new(&path);
    assert!(matches!(store.load(), Err(EtaError::Storage(_))));

    let model = EtaModel::new(Arc::new(store));
    assert!(!model.load_from_store());
    assert!(!model.is_trained());
}

#[test]
fn test_predictions_during_retraining_stay_consistent() {
    let model = Arc::new(EtaModel::new(Arc::new(MemoryModelStore::new())));
    model.train(&config(200, 3)).unwrap();

    let trainer = {
        let model = model.clone();
        thread::spawn(move || {
            for samples in [300, 400] {
                model.train(&config(samples, 3)).unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|i| {
            let model = model.clone();
            thread::spawn(move || {
                let from = Coordinate::new(14.55 + i as f64 * 0.01, 121.0);
                let to = Coordinate::new(14.66, 121.07);
                for _ in 0..50 {
                    let eta = model.predict(from, to, at(9, 2)).unwrap();
                    assert!(eta.is_finite() && eta >= MIN_ETA_MINUTES);
                }
            })
        })
        .collect();

    trainer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(model.last_report().unwrap().samples_trained, 400);
}
