//! Direct-to-point paths: an optional turn followed by a great circle.

use glam::DVec3;
use std::f64::consts::{FRAC_PI_2, PI};

use crate::geo::{angle_between, meters_to_rad, normalize_180, GeoCircle, GeoPoint, TurnDirection, GEO_CIRCLE_TOLERANCE};
use crate::path::{put_vector, FlightPathVector, VectorFlags};

/// Great circle tangent to `turn` (same direction) that passes through `target`,
/// with its tangent point. Picks the solution with the shortest total path.
fn tangent_through(turn: &GeoCircle, start: DVec3, target: DVec3) -> Option<(GeoCircle, DVec3, f64)> {
    let locus = GeoCircle::new(turn.center, (turn.radius - FRAC_PI_2).abs());
    let plane = GeoCircle::new(target, FRAC_PI_2);

    locus
        .intersections(&plane)
        .as_slice()
        .iter()
        .filter_map(|&normal| {
            let straight = GeoCircle::new(normal, FRAC_PI_2);
            let tangent = turn.tangent_point(&straight)?;
            let along = straight.distance_along(tangent, target, GEO_CIRCLE_TOLERANCE);
            if along >= PI {
                return None;
            }
            let length = turn.distance_along(start, tangent, GEO_CIRCLE_TOLERANCE) + along;
            Some((straight, tangent, length))
        })
        .min_by(|a, b| a.2.total_cmp(&b.2))
}

/// Fly from `start` (tracking `start_course`) directly to `end`.
///
/// The turn goes toward the target unless `direction` forces one. When the
/// target sits inside the turn circle the opposite direction is tried, and
/// when neither works a plain great circle is emitted, flagged
/// [`VectorFlags::DEGRADED`].
pub fn build_direct_to_point(
    vectors: &mut Vec<FlightPathVector>,
    index: usize,
    start: &GeoPoint,
    start_course: f64,
    end: &GeoPoint,
    radius_m: f64,
    direction: Option<TurnDirection>,
    flags: VectorFlags,
) -> usize {
    let p = start.to_cartesian();
    let e = end.to_cartesian();
    let flags = flags | VectorFlags::DIRECT;
    if angle_between(p, e) <= GEO_CIRCLE_TOLERANCE {
        return 0;
    }

    let course_to_end = start.bearing_to(end);
    if radius_m <= 0.0 || normalize_180(course_to_end - start_course).abs() < 1e-3 {
        return build_straight(vectors, index, p, e, start_course, flags);
    }

    let preferred = direction.unwrap_or_else(|| TurnDirection::shortest(start_course, course_to_end));
    let candidates = match direction {
        Some(forced) => [Some(forced), None],
        None => [Some(preferred), Some(preferred.opposite())],
    };

    let radius = meters_to_rad(radius_m);
    for dir in candidates.into_iter().flatten() {
        let turn = GeoCircle::turn_circle(p, start_course, radius, dir);
        let Some((straight, tangent, _)) = tangent_through(&turn, p, e) else {
            continue;
        };

        let mut count = 0;
        let mut turn_flags = flags | VectorFlags::TURN_TO_COURSE;
        if dir != preferred {
            turn_flags |= VectorFlags::DEGRADED;
        }
        if turn.distance_along(p, tangent, GEO_CIRCLE_TOLERANCE) > GEO_CIRCLE_TOLERANCE {
            put_vector(vectors, index, FlightPathVector::from_circle(&turn, p, tangent, turn_flags));
            count += 1;
        }
        if straight.distance_along(tangent, e, GEO_CIRCLE_TOLERANCE) > GEO_CIRCLE_TOLERANCE {
            put_vector(vectors, index + count, FlightPathVector::from_circle(&straight, tangent, e, flags));
            count += 1;
        }
        return count;
    }

    tracing::debug!("direct-to target inside both turn circles, falling back to a great circle");
    build_straight(vectors, index, p, e, start_course, flags | VectorFlags::DEGRADED)
}

fn build_straight(
    vectors: &mut Vec<FlightPathVector>,
    index: usize,
    p: DVec3,
    e: DVec3,
    course: f64,
    flags: VectorFlags,
) -> usize {
    let circle = GeoCircle::great_circle_between(p, e).unwrap_or_else(|| GeoCircle::from_point_course(p, course));
    put_vector(vectors, index, FlightPathVector::from_circle(&circle, p, e, flags));
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::utils::{vector_final_course, vector_initial_course};

    #[test]
    fn test_direct_behind_turns_around() {
        let start = GeoPoint::new(10.0, 10.0);
        let end = start.offset_m(180.0, 20_000.0);
        let mut vectors = Vec::new();
        let count = build_direct_to_point(&mut vectors, 0, &start, 0.0, &end, 1500.0, None, VectorFlags::NONE);
        assert_eq!(count, 2);
        assert!(vectors[0].flags.contains(VectorFlags::TURN_TO_COURSE));
        assert!((vector_initial_course(&vectors[0]) - 0.0).abs() < 1e-3 || (vector_initial_course(&vectors[0]) - 360.0).abs() < 1e-3);
        assert!(vectors[1].end.distance_m(&end) < 0.5);
        assert!(vectors[0].end.distance_m(&vectors[1].start) < 0.5);
        let final_course = vector_final_course(&vectors[1]);
        assert!(normalize_180(final_course - 180.0).abs() < 10.0);
    }

    #[test]
    fn test_direct_aligned_is_straight() {
        let start = GeoPoint::new(10.0, 10.0);
        let end = start.offset_m(45.0, 20_000.0);
        let course = start.bearing_to(&end);
        let mut vectors = Vec::new();
        let count = build_direct_to_point(&mut vectors, 0, &start, course, &end, 1500.0, None, VectorFlags::NONE);
        assert_eq!(count, 1);
        assert!(vectors[0].flags.contains(VectorFlags::DIRECT));
        assert!((vectors[0].distance - 20_000.0).abs() < 0.5);
    }

    #[test]
    fn test_target_inside_turn_circle_uses_other_side() {
        let start = GeoPoint::new(0.0, 0.0);
        // 500 m to the right of a northbound aircraft with a 1500 m turn radius
        let end = start.offset_m(90.0, 500.0);
        let mut vectors = Vec::new();
        let count = build_direct_to_point(&mut vectors, 0, &start, 0.0, &end, 1500.0, None, VectorFlags::NONE);
        assert!(count >= 1);
        assert!(vectors[0].flags.contains(VectorFlags::DEGRADED));
        assert!(vectors[count - 1].end.distance_m(&end) < 0.5);
    }
}
