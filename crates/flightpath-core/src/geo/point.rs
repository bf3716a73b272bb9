use glam::DVec3;
use serde::{Deserialize, Serialize};

use super::{angle_between, bearing_of_direction, normalize_360, offset_cartesian, EARTH_RADIUS_M, GEO_CIRCLE_TOLERANCE};

/// A point on the reference sphere, in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn from_cartesian(v: DVec3) -> Self {
        let v = v.normalize();
        Self {
            lat: v.z.clamp(-1.0, 1.0).asin().to_degrees(),
            lon: v.y.atan2(v.x).to_degrees(),
        }
    }

    pub fn to_cartesian(&self) -> DVec3 {
        let (sin_lat, cos_lat) = self.lat.to_radians().sin_cos();
        let (sin_lon, cos_lon) = self.lon.to_radians().sin_cos();
        DVec3::new(cos_lat * cos_lon, cos_lat * sin_lon, sin_lat)
    }

    /// Great-circle distance in radians.
    pub fn distance(&self, other: &GeoPoint) -> f64 {
        angle_between(self.to_cartesian(), other.to_cartesian())
    }

    /// Great-circle distance in meters.
    pub fn distance_m(&self, other: &GeoPoint) -> f64 {
        self.distance(other) * EARTH_RADIUS_M
    }

    /// Initial true bearing (degrees, [0, 360)) of the great circle to `other`.
    pub fn bearing_to(&self, other: &GeoPoint) -> f64 {
        let phi1 = self.lat.to_radians();
        let phi2 = other.lat.to_radians();
        let delta_lambda = (other.lon - self.lon).to_radians();

        let x = delta_lambda.sin() * phi2.cos();
        let y = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

        normalize_360(x.atan2(y).to_degrees())
    }

    /// Final true bearing on arrival at `other` along the great circle.
    pub fn final_bearing_to(&self, other: &GeoPoint) -> f64 {
        let a = self.to_cartesian();
        let b = other.to_cartesian();
        let normal = a.cross(b);
        if normal.length() < GEO_CIRCLE_TOLERANCE {
            return self.bearing_to(other);
        }
        bearing_of_direction(b, normal.normalize().cross(b))
    }

    /// Point reached after travelling `distance` radians along `bearing_deg`.
    pub fn offset(&self, bearing_deg: f64, distance: f64) -> GeoPoint {
        GeoPoint::from_cartesian(offset_cartesian(self.to_cartesian(), bearing_deg, distance))
    }

    pub fn offset_m(&self, bearing_deg: f64, distance_m: f64) -> GeoPoint {
        self.offset(bearing_deg, distance_m / EARTH_RADIUS_M)
    }

    pub fn antipode(&self) -> GeoPoint {
        GeoPoint::from_cartesian(-self.to_cartesian())
    }

    /// Whether both points are within `tolerance` radians of each other.
    pub fn equals(&self, other: &GeoPoint, tolerance: f64) -> bool {
        self.distance(other) <= tolerance
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite() && self.lat.abs() <= 90.0
    }
}

impl From<DVec3> for GeoPoint {
    fn from(v: DVec3) -> Self {
        GeoPoint::from_cartesian(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_distance() {
        // ~111km between these points (1 degree latitude)
        let dist = GeoPoint::new(0.0, 0.0).distance_m(&GeoPoint::new(1.0, 0.0));
        assert!((dist - 111_194.9).abs() < 1.0);
    }

    #[test]
    fn test_cartesian_round_trip() {
        let p = GeoPoint::new(-33.8688, 151.2093);
        let q = GeoPoint::from_cartesian(p.to_cartesian());
        assert!((p.lat - q.lat).abs() < 1e-10);
        assert!((p.lon - q.lon).abs() < 1e-10);
    }

    #[test]
    fn test_offset_matches_bearing_and_distance() {
        let start = GeoPoint::new(47.0, 8.0);
        let end = start.offset_m(135.0, 25_000.0);
        assert!((start.distance_m(&end) - 25_000.0).abs() < 0.01);
        assert!((start.bearing_to(&end) - 135.0).abs() < 1e-6);
    }

    #[test]
    fn test_final_bearing_on_equator() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(0.0, 10.0);
        assert!((a.final_bearing_to(&b) - 90.0).abs() < 1e-9);
    }
}
