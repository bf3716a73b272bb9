//! Procedure turn (course reversal) shape.
//!
//! Outbound leg, initial turn onto the procedure turn course, a 180 degree
//! turn, an inbound leg intercepting the inbound course, and a final turn
//! onto it. When the 180 degree turn leaves no room for the inbound leg, the
//! inbound leg is dropped and the final turn joins the inbound course
//! directly; those vectors carry [`VectorFlags::DEGRADED`].

use std::f64::consts::PI;

use super::connect::{directed_radius, tangent_circles};
use super::{great_circle, turn};
use crate::geo::{meters_to_rad, GeoCircle, GeoPoint, TurnDirection, GEO_CIRCLE_TOLERANCE};
use crate::path::{last_written, put_vector, FlightPathVector, VectorFlags};

#[derive(Debug, Clone)]
pub struct ProcedureTurnParams {
    /// Where the procedure turn begins (usually the procedure fix).
    pub start: GeoPoint,
    /// Course flown on arrival at `start`.
    pub start_course: f64,
    /// Procedure turn outbound course.
    pub outbound_course: f64,
    /// Length of the outbound leg in meters.
    pub outbound_distance_m: f64,
    /// Direction of the 180 degree turn.
    pub turn_direction: TurnDirection,
    /// Inbound course to join.
    pub inbound: GeoCircle,
    pub radius_m: f64,
}

/// Build the procedure turn. Returns the number of vectors written.
pub fn build(
    vectors: &mut Vec<FlightPathVector>,
    index: usize,
    params: &ProcedureTurnParams,
    flags: VectorFlags,
) -> usize {
    let flags = flags | VectorFlags::PROCEDURE_TURN;
    let mut count = 0;

    // initial turn onto the outbound course
    let initial_direction = TurnDirection::shortest(params.start_course, params.outbound_course);
    count += turn::build_turn_to_course(
        vectors,
        index + count,
        &params.start,
        params.radius_m,
        initial_direction,
        params.start_course,
        params.outbound_course,
        flags,
    );
    let outbound_start = last_written(vectors, index, count).map_or(params.start, |v| v.end);

    // outbound leg
    count += great_circle::build_from_course(
        vectors,
        index + count,
        &outbound_start,
        params.outbound_course,
        params.outbound_distance_m,
        flags,
    );
    let (reversal_start, outbound_final_course) = last_written(vectors, index, count)
        .map_or((params.start, params.outbound_course), |v| (v.end, crate::path::utils::vector_final_course(v)));

    // 180 degree turn
    let inbound_leg_course = outbound_final_course + 180.0;
    count += turn::build_turn_to_course(
        vectors,
        index + count,
        &reversal_start,
        params.radius_m,
        params.turn_direction,
        outbound_final_course,
        inbound_leg_course,
        flags,
    );
    let inbound_start = last_written(vectors, index, count).map_or(reversal_start, |v| v.end);

    // inbound leg and final turn
    let p = inbound_start.to_cartesian();
    let inbound_leg = GeoCircle::from_point_course(p, inbound_leg_course);
    let final_direction = final_turn_direction(&inbound_leg, &params.inbound, p);
    let radius = directed_radius(meters_to_rad(params.radius_m), final_direction);

    let solution = tangent_circles(&inbound_leg, &params.inbound, radius)
        .iter()
        .filter(|s| inbound_leg.angle_along(p, s.from_point, GEO_CIRCLE_TOLERANCE) < PI)
        .min_by(|a, b| {
            let da = inbound_leg.angle_along(p, a.from_point, GEO_CIRCLE_TOLERANCE);
            let db = inbound_leg.angle_along(p, b.from_point, GEO_CIRCLE_TOLERANCE);
            da.total_cmp(&db)
        })
        .copied();

    match solution {
        Some(solution) => {
            if inbound_leg.distance_along(p, solution.from_point, GEO_CIRCLE_TOLERANCE) > GEO_CIRCLE_TOLERANCE {
                put_vector(vectors, index + count, FlightPathVector::from_circle(&inbound_leg, p, solution.from_point, flags));
                count += 1;
            }
            put_vector(
                vectors,
                index + count,
                FlightPathVector::from_circle(&solution.circle, solution.from_point, solution.to_point, flags | VectorFlags::TURN_TO_COURSE),
            );
            count + 1
        }
        None => {
            tracing::debug!("procedure turn: no room for the inbound leg, joining the inbound course directly");
            count
                + turn::build_turn_to_join_great_circle(
                    vectors,
                    index + count,
                    &inbound_start,
                    inbound_leg_course,
                    &params.inbound,
                    params.radius_m,
                    None,
                    flags | VectorFlags::DEGRADED,
                )
        }
    }
}

/// Direction of the turn from the inbound leg onto the inbound course at
/// their intersection ahead of `from`.
fn final_turn_direction(inbound_leg: &GeoCircle, inbound: &GeoCircle, from: glam::DVec3) -> TurnDirection {
    let hit = inbound_leg
        .intersections(inbound)
        .as_slice()
        .iter()
        .copied()
        .min_by(|a, b| {
            inbound_leg
                .angle_along(from, *a, GEO_CIRCLE_TOLERANCE)
                .total_cmp(&inbound_leg.angle_along(from, *b, GEO_CIRCLE_TOLERANCE))
        })
        .unwrap_or(from);
    TurnDirection::shortest(inbound_leg.bearing_at(hit), inbound.bearing_at(hit))
}
