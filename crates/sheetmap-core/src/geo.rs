// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Geographic coordinates and great-circle distance.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters (IUGG).
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// A WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a point without range validation.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Create a point, returning `None` when either coordinate is non-finite
    /// or outside -90..=90 / -180..=180.
    #[must_use]
    pub fn checked(latitude: f64, longitude: f64) -> Option<Self> {
        let point = Self::new(latitude, longitude);
        point.is_valid().then_some(point)
    }

    /// Whether both coordinates are finite and within range.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Great-circle distance to `other` in meters.
    #[must_use]
    pub fn distance_meters(&self, other: &GeoPoint) -> f64 {
        haversine_distance_m(self.latitude, self.longitude, other.latitude, other.longitude)
    }

    /// Point reached by travelling `meters` due north (negative for south).
    ///
    /// Used for placing overlay geometry at a known distance from a center.
    #[must_use]
    pub fn offset_north(&self, meters: f64) -> GeoPoint {
        let delta = (meters / EARTH_RADIUS_METERS).to_degrees();
        GeoPoint::new((self.latitude + delta).clamp(-90.0, 90.0), self.longitude)
    }
}

/// Calculate distance between two lat/lon points using the Haversine formula (in meters).
#[must_use]
pub fn haversine_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_distance() {
        // LAX to JFK is approximately 3,983 km
        let distance = haversine_distance_m(33.9425, -118.4081, 40.6413, -73.7781);
        assert!((distance - 3_983_000.0).abs() < 20_000.0);
    }

    #[test]
    fn test_zero_distance() {
        let p = GeoPoint::new(51.5, -0.1);
        assert!(p.distance_meters(&p).abs() < f64::EPSILON);
    }

    #[test]
    fn test_offset_north_round_trips_distance() {
        let center = GeoPoint::new(51.5, -0.1);
        let moved = center.offset_north(1000.0);
        assert!((center.distance_meters(&moved) - 1000.0).abs() < 1e-6);
    }

    #[test]
    fn test_checked_rejects_out_of_range() {
        assert!(GeoPoint::checked(91.0, 0.0).is_none());
        assert!(GeoPoint::checked(0.0, -180.5).is_none());
        assert!(GeoPoint::checked(f64::NAN, 0.0).is_none());
        assert!(GeoPoint::checked(-90.0, 180.0).is_some());
    }
}
