pub mod coordinate;
pub mod prediction;
pub mod route;

pub use coordinate::{BoundingBox, Coordinate};
pub use prediction::PredictionResult;
pub use route::{FeatureVector, Route, TrainingSet};
