//! Spherical geodesy primitives used by the flight path engine.
//!
//! Points are stored as latitude/longitude in degrees and converted to unit
//! vectors (`glam::DVec3`) for the heavy lifting. Circles follow a single
//! direction convention: a circle is flown counter-clockwise about its
//! center, so a radius below pi/2 turns left and a radius above pi/2 turns
//! right.

mod circle;
mod point;

pub use circle::{GeoCircle, Intersections};
pub use point::GeoPoint;

use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Mean earth radius used for every metric conversion.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

pub const METERS_PER_NM: f64 = 1852.0;

/// Angular tolerance (radians) for "point lies on circle" checks.
pub const GEO_CIRCLE_TOLERANCE: f64 = 1e-7;

/// Direction of a constant-radius turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnDirection {
    Left,
    Right,
}

impl TurnDirection {
    pub fn opposite(self) -> Self {
        match self {
            TurnDirection::Left => TurnDirection::Right,
            TurnDirection::Right => TurnDirection::Left,
        }
    }

    /// Direction of the shortest turn from one course to another.
    pub fn shortest(from_course: f64, to_course: f64) -> Self {
        if normalize_180(to_course - from_course) < 0.0 {
            TurnDirection::Left
        } else {
            TurnDirection::Right
        }
    }
}

/// Convert meters to an angular distance (radians) on the reference sphere.
pub fn meters_to_rad(meters: f64) -> f64 {
    meters / EARTH_RADIUS_M
}

/// Convert an angular distance (radians) to meters on the reference sphere.
pub fn rad_to_meters(rad: f64) -> f64 {
    rad * EARTH_RADIUS_M
}

pub fn nm_to_meters(nm: f64) -> f64 {
    nm * METERS_PER_NM
}

/// Normalize degrees to [0, 360).
pub fn normalize_360(deg: f64) -> f64 {
    let x = deg.rem_euclid(360.0);
    if x >= 360.0 {
        0.0
    } else {
        x
    }
}

/// Normalize degrees to [-180, 180).
pub fn normalize_180(deg: f64) -> f64 {
    let x = normalize_360(deg);
    if x >= 180.0 {
        x - 360.0
    } else {
        x
    }
}

/// Signed course change (degrees) when turning from `from` to `to` in the
/// given direction. Left turns yield values in (-360, 0], right turns [0, 360).
pub fn turn_angle(from: f64, to: f64, direction: TurnDirection) -> f64 {
    let right = normalize_360(to - from);
    match direction {
        TurnDirection::Right => right,
        TurnDirection::Left => {
            if right == 0.0 {
                0.0
            } else {
                right - 360.0
            }
        }
    }
}

/// Angle in radians between two (not necessarily unit) vectors.
pub fn angle_between(a: DVec3, b: DVec3) -> f64 {
    a.cross(b).length().atan2(a.dot(b))
}

/// Rotate `v` about the unit `axis` by `angle` radians (right-hand rule).
pub fn rotate(v: DVec3, axis: DVec3, angle: f64) -> DVec3 {
    let (sin, cos) = angle.sin_cos();
    v * cos + axis.cross(v) * sin + axis * axis.dot(v) * (1.0 - cos)
}

/// Local north and east unit vectors at a unit position vector.
pub fn north_east(p: DVec3) -> (DVec3, DVec3) {
    let lon = p.y.atan2(p.x);
    let lat = p.z.clamp(-1.0, 1.0).asin();
    let (sin_lat, cos_lat) = lat.sin_cos();
    let (sin_lon, cos_lon) = lon.sin_cos();
    let north = DVec3::new(-sin_lat * cos_lon, -sin_lat * sin_lon, cos_lat);
    let east = DVec3::new(-sin_lon, cos_lon, 0.0);
    (north, east)
}

/// True bearing (degrees, [0, 360)) of a tangent direction at `p`.
pub fn bearing_of_direction(p: DVec3, dir: DVec3) -> f64 {
    let (north, east) = north_east(p);
    normalize_360(dir.dot(east).atan2(dir.dot(north)).to_degrees())
}

/// Unit tangent direction at `p` pointing along the given true bearing.
pub fn direction_of_bearing(p: DVec3, bearing_deg: f64) -> DVec3 {
    let (north, east) = north_east(p);
    let (sin, cos) = bearing_deg.to_radians().sin_cos();
    north * cos + east * sin
}

/// Point reached from `p` after travelling `distance` radians along `bearing_deg`.
pub fn offset_cartesian(p: DVec3, bearing_deg: f64, distance: f64) -> DVec3 {
    let dir = direction_of_bearing(p, bearing_deg);
    let (sin, cos) = distance.sin_cos();
    (p * cos + dir * sin).normalize()
}

/// Whether two unit vectors are (nearly) antipodal.
pub fn is_antipodal(a: DVec3, b: DVec3, tolerance: f64) -> bool {
    angle_between(a, b) > PI - tolerance
}
