//! Paths that run along a course until they meet another circle.

use glam::DVec3;
use std::f64::consts::PI;

use crate::geo::{GeoCircle, GeoPoint, GEO_CIRCLE_TOLERANCE};
use crate::path::{put_vector, FlightPathVector, VectorFlags};

/// First forward intersection (within half a revolution) of the great circle
/// from `start` along `course` with `target`.
pub fn intercept_point(start: DVec3, course: f64, target: &GeoCircle) -> Option<DVec3> {
    let path = GeoCircle::from_point_course(start, course);
    path.intersections(target)
        .as_slice()
        .iter()
        .map(|&hit| (hit, path.angle_along(start, hit, GEO_CIRCLE_TOLERANCE)))
        .filter(|(_, angle)| *angle <= PI)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(hit, _)| hit)
}

/// Great-circle path from `start` along `course` up to its first forward
/// intersection with `target`. Zero vectors when `start` already lies on
/// the target or the course never meets it.
pub fn build_circle_intercept(
    vectors: &mut Vec<FlightPathVector>,
    index: usize,
    start: &GeoPoint,
    course: f64,
    target: &GeoCircle,
    flags: VectorFlags,
) -> usize {
    let p = start.to_cartesian();
    if target.includes(p, GEO_CIRCLE_TOLERANCE) {
        return 0;
    }
    let Some(hit) = intercept_point(p, course, target) else {
        return 0;
    };
    let path = GeoCircle::from_point_course(p, course);
    put_vector(
        vectors,
        index,
        FlightPathVector::from_circle(&path, p, hit, flags | VectorFlags::INTERCEPT),
    );
    1
}
