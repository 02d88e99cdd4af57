// ============================
// crates/client-lib/src/geo.rs
// ============================
//! Distance and travel-time estimation from coordinates alone, used when no
//! routing service answers.

use convoy_common::GeoPoint;
use serde::{Deserialize, Serialize};

/// Earth's radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Straight-line distance underestimates road distance; pad it.
const ROAD_FACTOR: f64 = 1.2;

/// A `{lat, lng}` coordinate pair as the client works with them
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn to_point(self) -> GeoPoint {
        GeoPoint::new(self.lng, self.lat)
    }
}

impl From<GeoPoint> for LatLng {
    fn from(point: GeoPoint) -> Self {
        Self {
            lat: point.latitude(),
            lng: point.longitude(),
        }
    }
}

/// Assumed travel mode for time estimation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportMode {
    Walking,
    Cycling,
    #[default]
    Driving,
}

impl TransportMode {
    /// Average speed in km/h
    fn average_speed_kmh(self) -> f64 {
        match self {
            TransportMode::Walking => 5.0,
            TransportMode::Cycling => 15.0,
            TransportMode::Driving => 50.0,
        }
    }
}

/// Distance and duration with display text, as shown next to a participant
#[derive(Debug, Clone, PartialEq)]
pub struct TravelEstimate {
    pub distance_m: u64,
    pub distance_text: String,
    pub duration_s: u64,
    pub duration_text: String,
}

impl TravelEstimate {
    /// Build an estimate from measured values (meters, seconds)
    pub fn from_measures(distance_m: f64, duration_s: f64) -> Self {
        let distance_km = distance_m / 1000.0;
        let minutes = (duration_s / 60.0).round() as u64;
        Self {
            distance_m: distance_m.round() as u64,
            distance_text: format!("{distance_km:.1} km"),
            duration_s: minutes * 60,
            duration_text: format_minutes(minutes),
        }
    }
}

fn format_minutes(minutes: u64) -> String {
    if minutes < 60 {
        format!("{minutes} mins")
    } else {
        format!("{}h {}m", minutes / 60, minutes % 60)
    }
}

/// Great-circle distance between two points (haversine formula), in km
pub fn haversine_km(a: LatLng, b: LatLng) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);

    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// Estimate travel time over a straight-line distance, padded for roads
pub fn estimate_travel(distance_km: f64, mode: TransportMode) -> TravelEstimate {
    let adjusted_km = distance_km * ROAD_FACTOR;
    let hours = adjusted_km / mode.average_speed_kmh();
    let minutes = (hours * 60.0).round() as u64;

    TravelEstimate {
        distance_m: (distance_km * 1000.0).round() as u64,
        distance_text: format!("{distance_km:.1} km"),
        duration_s: minutes * 60,
        duration_text: format_minutes(minutes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_known_distance() {
        // Mumbai city center to Pune is roughly 120 km as the crow flies
        let mumbai = LatLng::new(19.0760, 72.8777);
        let pune = LatLng::new(18.5204, 73.8567);
        let km = haversine_km(mumbai, pune);
        assert!((118.0..122.0).contains(&km), "got {km}");
    }

    #[test]
    fn test_haversine_zero_for_same_point() {
        let point = LatLng::new(19.0760, 72.8777);
        assert!(haversine_km(point, point) < 1e-9);
    }

    #[test]
    fn test_estimate_applies_road_factor() {
        // 50 km driving at 50 km/h would be 60 mins; the 1.2 pad makes it 72
        let estimate = estimate_travel(50.0, TransportMode::Driving);
        assert_eq!(estimate.duration_s, 72 * 60);
        assert_eq!(estimate.duration_text, "1h 12m");
        assert_eq!(estimate.distance_m, 50_000);
        assert_eq!(estimate.distance_text, "50.0 km");
    }

    #[test]
    fn test_short_trips_render_minutes() {
        let estimate = estimate_travel(2.0, TransportMode::Walking);
        assert!(estimate.duration_text.ends_with("mins"));
    }

    #[test]
    fn test_latlng_point_round_trip() {
        let original = LatLng::new(19.0760, 72.8777);
        let point = original.to_point();
        assert_eq!(point.latitude(), 19.0760);
        assert_eq!(point.longitude(), 72.8777);
        assert_eq!(LatLng::from(point), original);
    }
}
