//! Synthetic delivery routes for training.
//!
//! Travel time is `distance * 3 min/km`, scaled by 1.5 during rush hour and
//! 0.8 on weekends, plus N(0, 2) minutes of noise, floored at one minute.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use statrs::distribution::Normal;

use crate::geo;
use crate::models::{BoundingBox, Coordinate, Route, TrainingSet};

pub const MINUTES_PER_KM: f64 = 3.0;
pub const RUSH_HOUR_MULTIPLIER: f64 = 1.5;
pub const WEEKEND_MULTIPLIER: f64 = 0.8;
pub const NOISE_STD_MINUTES: f64 = 2.0;
pub const MIN_TRAVEL_MINUTES: f64 = 1.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SynthConfig {
    pub samples: usize,
    pub bounds: BoundingBox,
    pub seed: u64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            samples: 1000,
            bounds: BoundingBox::default(),
            seed: 42,
        }
    }
}

pub fn is_rush_hour(hour: u32) -> bool {
    matches!(hour, 7..=9 | 17..=19)
}

pub fn is_weekend(weekday: u32) -> bool {
    weekday >= 5
}

/// Noise-free travel time for a route with the given features.
pub fn expected_travel_minutes(distance_km: f64, hour: u32, weekday: u32) -> f64 {
    let traffic = if is_rush_hour(hour) { RUSH_HOUR_MULTIPLIER } else { 1.0 };
    let weekend = if is_weekend(weekday) { WEEKEND_MULTIPLIER } else { 1.0 };
    distance_km * MINUTES_PER_KM * traffic * weekend
}

/// Draws `n` routes inside `bounds` using the caller's RNG.
pub fn generate<R: Rng>(n: usize, bounds: &BoundingBox, rng: &mut R) -> TrainingSet {
    let noise = Normal::new(0.0, NOISE_STD_MINUTES).expect("noise std is a positive constant");
    let mut routes = Vec::with_capacity(n);

    for i in 0..n {
        let pickup = sample_point(bounds, rng);
        let dropoff = sample_point(bounds, rng);
        let distance_km = geo::distance(pickup, dropoff);

        let hour = rng.gen_range(0..24u32);
        let weekday = rng.gen_range(0..7u32);

        let travel_time = expected_travel_minutes(distance_km, hour, weekday) + rng.sample(&noise);

        routes.push(Route {
            order_id: format!("ORDER_{:04}", i + 1),
            pickup,
            dropoff,
            distance_km,
            hour,
            weekday,
            travel_time_minutes: travel_time.max(MIN_TRAVEL_MINUTES),
        });
    }

    TrainingSet { routes }
}

/// Same as [`generate`] with a fresh local RNG built from `seed`.
pub fn generate_seeded(n: usize, bounds: &BoundingBox, seed: u64) -> TrainingSet {
    let mut rng = StdRng::seed_from_u64(seed);
    generate(n, bounds, &mut rng)
}

impl SynthConfig {
    pub fn generate(&self) -> TrainingSet {
        generate_seeded(self.samples, &self.bounds, self.seed)
    }
}

fn sample_point<R: Rng>(bounds: &BoundingBox, rng: &mut R) -> Coordinate {
    Coordinate::new(
        sample_range(bounds.lat, rng),
        sample_range(bounds.lng, rng),
    )
}

fn sample_range<R: Rng>((lo, hi): (f64, f64), rng: &mut R) -> f64 {
    if hi > lo {
        rng.gen_range(lo..hi)
    } else {
        lo
    }
}
