use serde::{Deserialize, Serialize};

use crate::error::{EtaError, EtaResult};

/// A WGS-84 position in decimal degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    /// Build a coordinate without range checks.
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Build a coordinate, rejecting values outside the valid ranges.
    pub fn validated(lat: f64, lng: f64) -> EtaResult<Self> {
        if !lat.is_finite() || !lng.is_finite() {
            return Err(EtaError::InvalidCoordinate(
                "coordinates must be numeric values".to_string(),
            ));
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(EtaError::InvalidCoordinate(format!(
                "latitude must be between -90 and 90, got {}",
                lat
            )));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(EtaError::InvalidCoordinate(format!(
                "longitude must be between -180 and 180, got {}",
                lng
            )));
        }
        Ok(Self { lat, lng })
    }
}

/// Rectangular sampling area for synthetic routes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub lat: (f64, f64),
    pub lng: (f64, f64),
}

impl BoundingBox {
    pub const fn new(lat: (f64, f64), lng: (f64, f64)) -> Self {
        Self { lat, lng }
    }

    pub fn contains(&self, point: &Coordinate) -> bool {
        point.lat >= self.lat.0
            && point.lat <= self.lat.1
            && point.lng >= self.lng.0
            && point.lng <= self.lng.1
    }
}

impl Default for BoundingBox {
    /// Metro Manila service area.
    fn default() -> Self {
        Self::new((14.5, 14.7), (120.9, 121.1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validated_accepts_extremes() {
        assert!(Coordinate::validated(90.0, 180.0).is_ok());
        assert!(Coordinate::validated(-90.0, -180.0).is_ok());
    }

    #[test]
    fn test_validated_rejects_out_of_range() {
        assert!(matches!(
            Coordinate::validated(90.5, 0.0),
            Err(EtaError::InvalidCoordinate(_))
        ));
        assert!(matches!(
            Coordinate::validated(0.0, -180.1),
            Err(EtaError::InvalidCoordinate(_))
        ));
        assert!(matches!(
            Coordinate::validated(f64::NAN, 0.0),
            Err(EtaError::InvalidCoordinate(_))
        ));
    }

    #[test]
    fn test_default_box_contains_makati() {
        let bbox = BoundingBox::default();
        assert!(bbox.contains(&Coordinate::new(14.5547, 121.0244)));
        assert!(!bbox.contains(&Coordinate::new(10.0, 121.0)));
    }
}
