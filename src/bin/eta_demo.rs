//! Offline walkthrough: train a model in-process and predict a few routes
//! between landmarks of the default service area.

use chrono::Local;
use std::sync::Arc;

use etacast::geo::landmarks;
use etacast::logger::{self, LogFormat};
use etacast::models::Coordinate;
use etacast::services::model_store::MemoryModelStore;
use etacast::services::predictor::{EtaModel, TrainConfig};

fn main() -> anyhow::Result<()> {
    logger::init(LogFormat::Pretty);

    let model = EtaModel::new(Arc::new(MemoryModelStore::new()));
    let report = model.train(&TrainConfig::default())?;
    println!(
        "Model trained: MAE {:.2} min, {} samples, {} held out",
        report.mae, report.samples_trained, report.test_samples
    );

    let routes: [(&str, Coordinate, Coordinate); 4] = [
        ("Makati CBD -> BGC", landmarks::MAKATI_CBD, landmarks::BGC),
        ("Manila -> Quezon City", landmarks::MANILA, landmarks::QUEZON_CITY),
        ("Ortigas -> Pasig", landmarks::ORTIGAS, landmarks::PASIG),
        ("Paranaque -> Las Pinas", landmarks::PARANAQUE, landmarks::LAS_PINAS),
    ];

    let now = Local::now().naive_local();
    for (name, from, to) in routes {
        let result = model.estimate(from, to, now)?;
        println!(
            "{:<24} {:>6.2} km  {:>6.2} min  {}",
            name, result.distance_km, result.eta_minutes, result.message
        );
    }

    let here = landmarks::MANDALUYONG;
    let arrived = model.estimate(here, here, now)?;
    println!(
        "{:<24} {:>6.2} km  {:>6.2} min  {}",
        "At the door", arrived.distance_km, arrived.eta_minutes, arrived.message
    );

    Ok(())
}
