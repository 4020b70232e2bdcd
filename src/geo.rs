//! Distance on the Earth's surface.
//!
//! `distance` is the geodesic on the WGS-84 ellipsoid (Karney's algorithm via
//! `geo`), which converges for every pair including near-antipodal ones.

use geo::{GeodesicDistance, HaversineDistance, Point};

use crate::models::Coordinate;

/// Geodesic distance in kilometres. Symmetric, zero for identical points.
///
/// Non-finite input yields NaN; callers reject it.
pub fn distance(a: Coordinate, b: Coordinate) -> f64 {
    if !is_finite(a) || !is_finite(b) {
        return f64::NAN;
    }
    if a == b {
        return 0.0;
    }
    // Fixed argument order keeps the result bit-identical in both directions.
    let (p, q) = if (a.lat, a.lng) <= (b.lat, b.lng) { (a, b) } else { (b, a) };
    (point(p).geodesic_distance(&point(q)) / 1000.0).max(0.0)
}

/// Great-circle distance on the mean-radius sphere, in kilometres.
pub fn haversine(a: Coordinate, b: Coordinate) -> f64 {
    point(a).haversine_distance(&point(b)) / 1000.0
}

fn point(c: Coordinate) -> Point<f64> {
    Point::new(c.lng, c.lat)
}

fn is_finite(c: Coordinate) -> bool {
    c.lat.is_finite() && c.lng.is_finite()
}

/// Well-known points around the default service area.
pub mod landmarks {
    use crate::models::Coordinate;

    pub const MAKATI_CBD: Coordinate = Coordinate::new(14.5547, 121.0244);
    pub const BGC: Coordinate = Coordinate::new(14.5176, 121.0509);
    pub const ORTIGAS: Coordinate = Coordinate::new(14.5866, 121.0611);
    pub const QUEZON_CITY: Coordinate = Coordinate::new(14.6760, 121.0437);
    pub const MANILA: Coordinate = Coordinate::new(14.5995, 120.9842);
    pub const PASIG: Coordinate = Coordinate::new(14.5764, 121.0851);
    pub const MANDALUYONG: Coordinate = Coordinate::new(14.5774, 121.0359);
    pub const TAGUIG: Coordinate = Coordinate::new(14.5243, 121.0792);
    pub const PARANAQUE: Coordinate = Coordinate::new(14.4793, 121.0198);
    pub const LAS_PINAS: Coordinate = Coordinate::new(14.4304, 121.0098);

    pub const ALL: [(&str, Coordinate); 10] = [
        ("makati_cbd", MAKATI_CBD),
        ("bgc", BGC),
        ("ortigas", ORTIGAS),
        ("quezon_city", QUEZON_CITY),
        ("manila", MANILA),
        ("pasig", PASIG),
        ("mandaluyong", MANDALUYONG),
        ("taguig", TAGUIG),
        ("paranaque", PARANAQUE),
        ("las_pinas", LAS_PINAS),
    ];
}
