use serde::{Deserialize, Serialize};

use super::coordinate::Coordinate;

/// Number of features fed to the estimator.
pub const FEATURE_COUNT: usize = 3;

/// `[distance_km, hour, weekday]`
pub type FeatureVector = [f64; FEATURE_COUNT];

pub fn features(distance_km: f64, hour: u32, weekday: u32) -> FeatureVector {
    [distance_km, hour as f64, weekday as f64]
}

/// One synthetic delivery with its observed travel time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub order_id: String,
    pub pickup: Coordinate,
    pub dropoff: Coordinate,
    pub distance_km: f64,
    pub hour: u32,
    /// Monday = 0
    pub weekday: u32,
    pub travel_time_minutes: f64,
}

impl Route {
    pub fn features(&self) -> FeatureVector {
        features(self.distance_km, self.hour, self.weekday)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrainingSet {
    pub routes: Vec<Route>,
}

impl TrainingSet {
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Split into (train, test) using a pre-shuffled index order.
    /// The test side gets `ceil(len * test_ratio)` rows.
    pub fn split(&self, order: &[usize], test_ratio: f64) -> (Vec<&Route>, Vec<&Route>) {
        let test_len = ((self.len() as f64) * test_ratio).ceil() as usize;
        let test_len = test_len.min(self.len());
        let (test_idx, train_idx) = order.split_at(test_len);
        let pick = |idx: &[usize]| idx.iter().map(|&i| &self.routes[i]).collect::<Vec<_>>();
        (pick(train_idx), pick(test_idx))
    }
}
