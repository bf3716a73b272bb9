//! Constant-radius turns.

use glam::DVec3;
use std::f64::consts::{FRAC_PI_2, PI};

use super::connect::tangent_circles;
use crate::geo::{
    meters_to_rad, turn_angle, GeoCircle, GeoPoint, TurnDirection, GEO_CIRCLE_TOLERANCE,
};
use crate::path::{put_vector, FlightPathVector, VectorFlags};

/// Turn of `radius_m` from `from_course` to `to_course` starting at `start`.
/// Flagged [`VectorFlags::TURN_TO_COURSE`]. No vector when the courses match.
pub fn build_turn_to_course(
    vectors: &mut Vec<FlightPathVector>,
    index: usize,
    start: &GeoPoint,
    radius_m: f64,
    direction: TurnDirection,
    from_course: f64,
    to_course: f64,
    flags: VectorFlags,
) -> usize {
    let angle = turn_angle(from_course, to_course, direction);
    if angle.abs() < 1e-6 || radius_m <= 0.0 {
        return 0;
    }

    let p = start.to_cartesian();
    let circle = GeoCircle::turn_circle(p, from_course, meters_to_rad(radius_m), direction);
    let end = circle.point_at_bearing(p, to_course, angle);

    put_vector(
        vectors,
        index,
        FlightPathVector::from_circle(&circle, p, end, flags | VectorFlags::TURN_TO_COURSE),
    );
    1
}

/// Turn from `start_course` until the path runs parallel to the great circle
/// `target`, i.e. to the turn's closest point of approach to the target.
pub fn build_turn_to_join_great_circle(
    vectors: &mut Vec<FlightPathVector>,
    index: usize,
    start: &GeoPoint,
    start_course: f64,
    target: &GeoCircle,
    radius_m: f64,
    direction: Option<TurnDirection>,
    flags: VectorFlags,
) -> usize {
    let p = start.to_cartesian();
    let Some(closest) = target.closest(p) else {
        return 0;
    };
    let target_course = target.bearing_at(closest);
    let direction = direction.unwrap_or_else(|| TurnDirection::shortest(start_course, target_course));
    build_turn_to_course(vectors, index, start, radius_m, direction, start_course, target_course, flags)
}

/// One candidate turn-straight-turn solution.
struct JoinSolution {
    first: GeoCircle,
    straight: GeoCircle,
    second: GeoCircle,
    first_tangent: DVec3,
    second_tangent: DVec3,
    length: f64,
}

/// Path pinned at both ends: turn away from `start_course`, fly a great
/// circle, then turn onto `end_course` so as to arrive at `end`.
///
/// Turn directions may be forced; otherwise every combination is evaluated
/// and the shortest wins. Returns 0 when no tangent construction exists.
pub fn build_turn_to_join_at_point(
    vectors: &mut Vec<FlightPathVector>,
    index: usize,
    start: &GeoPoint,
    start_course: f64,
    end: &GeoPoint,
    end_course: f64,
    radius_m: f64,
    first_direction: Option<TurnDirection>,
    second_direction: Option<TurnDirection>,
    flags: VectorFlags,
) -> usize {
    if radius_m <= 0.0 {
        return 0;
    }
    let radius = meters_to_rad(radius_m);
    let p = start.to_cartesian();
    let e = end.to_cartesian();

    let firsts = direction_candidates(first_direction);
    let seconds = direction_candidates(second_direction);

    let mut best: Option<JoinSolution> = None;
    for first_dir in firsts.iter().flatten() {
        let first = GeoCircle::turn_circle(p, start_course, radius, *first_dir);
        for second_dir in seconds.iter().flatten() {
            let second = GeoCircle::turn_circle(e, end_course, radius, *second_dir);
            for connector in tangent_circles(&first, &second, FRAC_PI_2).iter() {
                let along_straight =
                    connector
                        .circle
                        .distance_along(connector.from_point, connector.to_point, GEO_CIRCLE_TOLERANCE);
                if along_straight > PI - GEO_CIRCLE_TOLERANCE {
                    continue;
                }
                let length = first.distance_along(p, connector.from_point, GEO_CIRCLE_TOLERANCE)
                    + along_straight
                    + second.distance_along(connector.to_point, e, GEO_CIRCLE_TOLERANCE);
                if best.as_ref().map(|b| length < b.length).unwrap_or(true) {
                    best = Some(JoinSolution {
                        first,
                        straight: connector.circle,
                        second,
                        first_tangent: connector.from_point,
                        second_tangent: connector.to_point,
                        length,
                    });
                }
            }
        }
    }

    let Some(solution) = best else {
        return 0;
    };

    let mut count = 0;
    let segments = [
        (solution.first, p, solution.first_tangent, VectorFlags::TURN_TO_COURSE),
        (solution.straight, solution.first_tangent, solution.second_tangent, VectorFlags::NONE),
        (solution.second, solution.second_tangent, e, VectorFlags::TURN_TO_COURSE),
    ];
    for (circle, from, to, extra) in segments {
        if circle.distance_along(from, to, GEO_CIRCLE_TOLERANCE) > GEO_CIRCLE_TOLERANCE {
            put_vector(vectors, index + count, FlightPathVector::from_circle(&circle, from, to, flags | extra));
            count += 1;
        }
    }
    count
}

fn direction_candidates(forced: Option<TurnDirection>) -> [Option<TurnDirection>; 2] {
    match forced {
        Some(direction) => [Some(direction), None],
        None => [Some(TurnDirection::Left), Some(TurnDirection::Right)],
    }
}
