//! Stateless helpers over flight path vectors.

use glam::DVec3;
use std::f64::consts::{FRAC_PI_2, PI, TAU};

use super::vector::FlightPathVector;
use crate::geo::{
    meters_to_rad, GeoCircle, GeoPoint, TurnDirection, EARTH_RADIUS_M, GEO_CIRCLE_TOLERANCE,
};
use crate::legs::LegCalculation;

const GRAVITY_MPS2: f64 = 9.80665;
const MPS_PER_KNOT: f64 = 1852.0 / 3600.0;

/// Trimmed vectors shorter than this are dropped.
const MIN_VECTOR_LENGTH_M: f64 = 0.01;

/// Turn radius in meters for a coordinated turn at `speed_kt` and `bank_deg`.
pub fn turn_radius_m(speed_kt: f64, bank_deg: f64) -> f64 {
    let v = speed_kt.max(0.0) * MPS_PER_KNOT;
    let tan = bank_deg.clamp(1.0, 89.0).to_radians().tan();
    v * v / (GRAVITY_MPS2 * tan)
}

/// Initial true course of a vector, in degrees.
pub fn vector_initial_course(vector: &FlightPathVector) -> f64 {
    vector.circle().bearing_at(vector.start_cartesian())
}

/// Final true course of a vector, in degrees.
pub fn vector_final_course(vector: &FlightPathVector) -> f64 {
    vector.circle().bearing_at(vector.end_cartesian())
}

pub fn vector_turn_direction(vector: &FlightPathVector) -> Option<TurnDirection> {
    vector.circle().turn_direction()
}

pub fn vector_turn_radius_m(vector: &FlightPathVector) -> f64 {
    vector.circle().turn_radius() * EARTH_RADIUS_M
}

/// Turn circle through `point` tangent to `course`, with a radius in meters.
pub fn turn_circle(point: &GeoPoint, course: f64, radius_m: f64, direction: TurnDirection) -> GeoCircle {
    GeoCircle::turn_circle(point.to_cartesian(), course, meters_to_rad(radius_m), direction)
}

/// Half the interior angle between two tracks, radians. Course changes are
/// clamped to [0, 180] degrees; non-finite input counts as no change.
fn half_interior_angle(course_change_deg: f64) -> f64 {
    let change = if course_change_deg.is_finite() { course_change_deg.abs().min(180.0) } else { 0.0 };
    (PI - change.to_radians()) / 2.0
}

/// Distance (meters) from the junction of two great-circle tracks back to
/// where a turn of `radius_m` through `course_change_deg` must begin.
///
/// Capped at a quarter great circle, which is what a reversal or a radius
/// far beyond any leg length asks for.
pub fn turn_anticipation_distance(radius_m: f64, course_change_deg: f64) -> f64 {
    if radius_m.is_nan() || radius_m <= 0.0 {
        return 0.0;
    }
    let radius = meters_to_rad(radius_m).min(FRAC_PI_2 - 1e-9);
    let ratio = radius.tan() / half_interior_angle(course_change_deg).tan().max(f64::EPSILON);
    ratio.clamp(0.0, 1.0).asin() * EARTH_RADIUS_M
}

/// Largest turn radius (meters) whose anticipation fits within `distance_m`.
pub fn max_turn_radius_for_anticipation(distance_m: f64, course_change_deg: f64) -> f64 {
    let distance = meters_to_rad(distance_m.max(0.0)).min(FRAC_PI_2);
    (distance.sin() * half_interior_angle(course_change_deg).tan()).atan() * EARTH_RADIUS_M
}

/// Signed along-track distance (meters) of `point` from the vector's start.
///
/// Points behind the start yield negative values. The point is projected
/// onto the vector's circle first, so it need not lie exactly on it.
pub fn distance_along_vector(vector: &FlightPathVector, point: &GeoPoint) -> f64 {
    let circle = vector.circle();
    let sin = circle.radius.sin();
    if sin < 1e-12 {
        return 0.0;
    }
    let start = vector.start_cartesian();
    let p = point.to_cartesian();
    let arc_angle = vector.distance / EARTH_RADIUS_M / sin;
    let mut angle = circle.angle_along(start, p, 0.0);
    if angle > (arc_angle + TAU) / 2.0 {
        angle -= TAU;
    }
    angle * sin * EARTH_RADIUS_M
}

/// Whether `point` falls within the vector's extent, allowing `tolerance_m`
/// beyond either end and off the circle.
pub fn is_point_along_vector(vector: &FlightPathVector, point: &GeoPoint, tolerance_m: f64) -> bool {
    let circle = vector.circle();
    let tolerance = meters_to_rad(tolerance_m).max(GEO_CIRCLE_TOLERANCE);
    if !circle.includes(point.to_cartesian(), tolerance) {
        return false;
    }
    let along = distance_along_vector(vector, point);
    along >= -tolerance_m && along <= vector.distance + tolerance_m
}

/// Point `distance_m` along the vector from its start.
pub fn point_along_vector(vector: &FlightPathVector, distance_m: f64) -> GeoPoint {
    let circle = vector.circle();
    GeoPoint::from_cartesian(circle.offset_distance_along(vector.start_cartesian(), meters_to_rad(distance_m)))
}

/// Total length in meters of a list of vectors.
pub fn path_length(vectors: &[FlightPathVector]) -> f64 {
    vectors.iter().map(|v| v.distance).sum()
}

/// Copy of `vector` restricted to the part between `start` and `end`.
/// Returns `None` when the remainder would be empty or inverted.
pub fn trim_vector(vector: &FlightPathVector, start: DVec3, end: DVec3) -> Option<FlightPathVector> {
    let from = distance_along_vector(vector, &GeoPoint::from_cartesian(start));
    let to = distance_along_vector(vector, &GeoPoint::from_cartesian(end));
    if to - from < MIN_VECTOR_LENGTH_M {
        return None;
    }
    let mut trimmed = FlightPathVector::from_circle(&vector.circle(), start, end, vector.flags);
    trimmed.heading = vector.heading;
    trimmed.is_heading_true = vector.is_heading_true;
    Some(trimmed)
}

/// Thread ingress, the interior of the flight path and egress into the single
/// list of vectors actually flown.
pub fn resolve_ingress_to_egress_vectors(
    flight_path: &[FlightPathVector],
    ingress: &[FlightPathVector],
    ingress_join_index: usize,
    egress: &[FlightPathVector],
    egress_join_index: usize,
    out: &mut Vec<FlightPathVector>,
) {
    out.clear();

    if ingress.is_empty() && egress.is_empty() {
        out.extend_from_slice(flight_path);
        return;
    }

    out.extend_from_slice(ingress);

    if flight_path.is_empty() {
        out.extend_from_slice(egress);
        return;
    }

    let last = flight_path.len() - 1;
    let join_in = if ingress.is_empty() { 0 } else { ingress_join_index.min(last) };
    let join_out = if egress.is_empty() { last } else { egress_join_index.min(last) };

    if join_out >= join_in {
        for (i, vector) in flight_path.iter().enumerate().take(join_out + 1).skip(join_in) {
            let trim_start = (i == join_in).then(|| ingress.last()).flatten();
            let trim_end = (i == join_out).then(|| egress.first()).flatten();

            let start = trim_start.map(|v| v.end).unwrap_or(vector.start);
            let end = trim_end.map(|v| v.start).unwrap_or(vector.end);

            if start == vector.start && end == vector.end {
                out.push(vector.clone());
            } else if let Some(trimmed) = trim_vector(vector, start.to_cartesian(), end.to_cartesian()) {
                out.push(trimmed);
            }
        }
    }

    out.extend_from_slice(egress);
}

/// Resolve a leg calculation's `ingress_to_egress` in place.
pub fn resolve_ingress_to_egress(calc: &mut LegCalculation) {
    let mut out = std::mem::take(&mut calc.ingress_to_egress);
    resolve_ingress_to_egress_vectors(
        &calc.flight_path,
        &calc.ingress,
        calc.ingress_join_index,
        &calc.egress,
        calc.egress_join_index,
        &mut out,
    );
    calc.ingress_to_egress = out;
}

/// Final true course of a calculated leg, looking at its flown path first.
pub fn leg_final_course(calc: &LegCalculation) -> Option<f64> {
    calc.ingress_to_egress
        .last()
        .or_else(|| calc.flight_path.last())
        .map(vector_final_course)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::VectorFlags;

    fn great_circle_vector(a: GeoPoint, b: GeoPoint) -> FlightPathVector {
        let circle = GeoCircle::great_circle_between(a.to_cartesian(), b.to_cartesian()).unwrap();
        FlightPathVector::from_circle(&circle, a.to_cartesian(), b.to_cartesian(), VectorFlags::NONE)
    }

    #[test]
    fn test_turn_radius_standard_rate() {
        // 150 kt at 25 degrees bank is roughly 1.3 km
        let r = turn_radius_m(150.0, 25.0);
        assert!(r > 1200.0 && r < 1400.0, "unexpected radius {r}");
    }

    #[test]
    fn test_anticipation_matches_flat_approximation() {
        // r tan(delta / 2) for small radii
        let a = turn_anticipation_distance(1000.0, 90.0);
        assert!((a - 1000.0).abs() < 0.1, "anticipation {a}");
        let r = max_turn_radius_for_anticipation(a, 90.0);
        assert!((r - 1000.0).abs() < 1e-6);
        assert!(turn_anticipation_distance(1000.0, 0.0) < 1e-9);
    }

    #[test]
    fn test_anticipation_finite_for_degenerate_turns() {
        let quarter = FRAC_PI_2 * EARTH_RADIUS_M;
        for change in [179.9, 180.0, -180.0, 270.0] {
            let a = turn_anticipation_distance(1000.0, change);
            assert!(a.is_finite() && a <= quarter + 1e-6, "{change}: {a}");
        }
        // radius far beyond any leg
        let huge = turn_anticipation_distance(5.0e7, 90.0);
        assert!(huge.is_finite() && huge <= quarter + 1e-6);
        assert_eq!(turn_anticipation_distance(0.0, 180.0), 0.0);
        assert_eq!(turn_anticipation_distance(f64::NAN, 90.0), 0.0);
        assert!(turn_anticipation_distance(1000.0, f64::NAN) < 1e-6);

        assert!(max_turn_radius_for_anticipation(-10.0, 90.0).abs() < 1e-9);
        assert!(max_turn_radius_for_anticipation(500.0, 180.0).abs() < 1e-6);
        assert!(max_turn_radius_for_anticipation(1.0e9, 90.0).is_finite());
    }

    #[test]
    fn test_distance_along_vector_signed() {
        let v = great_circle_vector(GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 1.0));
        let mid = GeoPoint::new(0.0, 0.5);
        let before = GeoPoint::new(0.0, -0.1);
        assert!((distance_along_vector(&v, &mid) - v.distance / 2.0).abs() < 0.01);
        assert!(distance_along_vector(&v, &before) < 0.0);
        assert!(is_point_along_vector(&v, &mid, 1.0));
        assert!(!is_point_along_vector(&v, &before, 1.0));
    }

    #[test]
    fn test_resolve_without_transitions_is_identity() {
        let path = vec![
            great_circle_vector(GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 1.0)),
            great_circle_vector(GeoPoint::new(0.0, 1.0), GeoPoint::new(1.0, 1.0)),
        ];
        let mut out = Vec::new();
        resolve_ingress_to_egress_vectors(&path, &[], 0, &[], 0, &mut out);
        assert_eq!(out, path);
    }

    #[test]
    fn test_resolve_trims_join_vector() {
        let path = vec![great_circle_vector(GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 1.0))];
        let ingress = vec![great_circle_vector(GeoPoint::new(-0.2, 0.1), GeoPoint::new(0.0, 0.2))];
        let egress = vec![great_circle_vector(GeoPoint::new(0.0, 0.8), GeoPoint::new(0.2, 0.9))];
        let mut out = Vec::new();
        resolve_ingress_to_egress_vectors(&path, &ingress, 0, &egress, 0, &mut out);
        assert_eq!(out.len(), 3);
        assert!((out[1].start.lon - 0.2).abs() < 1e-9);
        assert!((out[1].end.lon - 0.8).abs() < 1e-9);
        assert!((out[1].distance - path[0].distance * 0.6).abs() < 1.0);
    }

    #[test]
    fn test_resolve_drops_zero_length_remainder() {
        let path = vec![great_circle_vector(GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 1.0))];
        let ingress = vec![great_circle_vector(GeoPoint::new(-1.0, 1.0), GeoPoint::new(0.0, 1.0))];
        let mut out = Vec::new();
        resolve_ingress_to_egress_vectors(&path, &ingress, 0, &[], 0, &mut out);
        assert_eq!(out.len(), 1);
    }
}
