use serde::{Serialize, Serializer};

/// Qualitative delivery status shown to the customer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProximityStatus {
    ArrivingVerySoon,
    Nearby,
    ArrivingSoon,
    OnTheWay,
    InProgress,
}

impl ProximityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProximityStatus::ArrivingVerySoon => "arriving very soon",
            ProximityStatus::Nearby => "nearby, preparing for arrival",
            ProximityStatus::ArrivingSoon => "arriving soon",
            ProximityStatus::OnTheWay => "on the way, arriving shortly",
            ProximityStatus::InProgress => "delivery in progress",
        }
    }
}

impl std::fmt::Display for ProximityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ProximityStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Distance rules take precedence over ETA rules.
pub fn classify(distance_km: f64, eta_minutes: f64) -> ProximityStatus {
    if distance_km < 0.5 {
        ProximityStatus::ArrivingVerySoon
    } else if distance_km < 2.0 {
        ProximityStatus::Nearby
    } else if eta_minutes < 5.0 {
        ProximityStatus::ArrivingSoon
    } else if eta_minutes < 15.0 {
        ProximityStatus::OnTheWay
    } else {
        ProximityStatus::InProgress
    }
}
