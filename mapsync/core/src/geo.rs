//! Geographic positions
//!
//! The sync layer never projects or validates coordinates. Positions are
//! carried from the backend to the surface exactly as received.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A latitude/longitude pair
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lng: f64,
}

impl LatLng {
    /// Create a new position
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl From<(f64, f64)> for LatLng {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self::new(lat, lng)
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lat, self.lng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latlng_from_tuple() {
        let pos: LatLng = (10.0, 20.0).into();
        assert_eq!(pos, LatLng::new(10.0, 20.0));
    }

    #[test]
    fn test_latlng_display() {
        assert_eq!(LatLng::new(-33.45, -70.66).to_string(), "(-33.45, -70.66)");
    }
}
