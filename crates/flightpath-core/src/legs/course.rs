//! Course and heading legs with a computed length: CA, VA, FA, FC, FM, VM.

use super::context::{estimated_start_altitude, finish, leg_start, LegContext, LegStart};
use super::model::{FlightPlanLeg, LegCalculation, LegDefinition};
use crate::builders::{build_turn_to_course, great_circle};
use crate::geo::{nm_to_meters, normalize_180, GeoPoint, TurnDirection};
use crate::path::{FlightPathVector, VectorFlags};

/// Course changes below this many degrees are flown without a turn vector.
const MIN_TURN_DEG: f64 = 0.5;

/// Turn from the start course onto `course` when they differ. Returns the
/// vectors written, the point where the course begins and the turn length.
pub(super) fn turn_onto_course(
    vectors: &mut Vec<FlightPathVector>,
    start: &LegStart,
    course: f64,
    radius_m: f64,
    direction: Option<TurnDirection>,
) -> (usize, GeoPoint, f64) {
    let Some(from) = start.course else {
        return (0, start.point, 0.0);
    };
    if normalize_180(course - from).abs() < MIN_TURN_DEG {
        return (0, start.point, 0.0);
    }
    let direction = direction.unwrap_or_else(|| TurnDirection::shortest(from, course));
    let count = build_turn_to_course(vectors, 0, &start.point, radius_m, direction, from, course, VectorFlags::NONE);
    if count == 0 {
        return (0, start.point, 0.0);
    }
    (count, vectors[count - 1].end, vectors[count - 1].distance)
}

/// Tag straight vectors of heading legs with the heading to fly.
pub(super) fn apply_heading(vectors: &mut [FlightPathVector], leg: &FlightPlanLeg) {
    if !leg.leg_type.is_heading() {
        return;
    }
    for vector in vectors.iter_mut().filter(|v| v.is_great_circle()) {
        vector.heading = Some(leg.course);
        vector.is_heading_true = leg.true_degrees;
        vector.flags.insert(VectorFlags::CONSTANT_HEADING);
    }
}

/// Course line of `length_m` starting at `start`, preceded by a turn onto it.
fn build_course_leg(
    ctx: &LegContext<'_>,
    leg: &FlightPlanLeg,
    calc: &mut LegCalculation,
    start: &LegStart,
    course: f64,
    length_m: f64,
) {
    let (mut count, from, turned) = turn_onto_course(
        &mut calc.flight_path,
        start,
        course,
        ctx.leg_turn_radius(),
        leg.turn_direction,
    );
    count += great_circle::build_from_course(
        &mut calc.flight_path,
        count,
        &from,
        course,
        (length_m - turned).max(0.0),
        VectorFlags::NONE,
    );
    apply_heading(&mut calc.flight_path[..count], leg);
    finish(calc, count, Some(start.point));
}

/// CA and VA: fly the course until the climb to the leg altitude completes.
pub fn calculate_course_to_altitude(
    ctx: &LegContext<'_>,
    legs: &[LegDefinition],
    index: usize,
    active_leg_index: usize,
    calc: &mut LegCalculation,
) {
    let leg = &legs[index].leg;
    let Some(start) = leg_start(ctx, legs, index, active_leg_index) else {
        finish(calc, 0, None);
        return;
    };
    let (course, mag_var) = ctx.true_course(leg, None, &start.point);
    calc.course_mag_var = mag_var;

    let start_altitude = match (start.from_aircraft, ctx.state) {
        (true, Some(state)) => state.altitude,
        _ => estimated_start_altitude(ctx, legs, index),
    };
    let length = ctx.climb_distance_m(start_altitude, leg.altitude1);
    build_course_leg(ctx, leg, calc, &start, course, length);
}

/// FA: from the fix along the course until the climb completes.
pub fn calculate_fix_to_altitude(ctx: &LegContext<'_>, legs: &[LegDefinition], index: usize, calc: &mut LegCalculation) {
    let leg = &legs[index].leg;
    let Some(fix) = ctx.fix(leg) else {
        finish(calc, 0, None);
        return;
    };
    let (course, mag_var) = ctx.true_course(leg, Some(&fix), &fix.location);
    calc.course_mag_var = mag_var;
    let length = ctx.climb_distance_m(estimated_start_altitude(ctx, legs, index), leg.altitude1);
    let start = LegStart { point: fix.location, course: None, from_aircraft: false };
    build_course_leg(ctx, leg, calc, &start, course, length);
}

/// FC: from the fix along the course for the leg distance.
pub fn calculate_fix_to_distance(ctx: &LegContext<'_>, legs: &[LegDefinition], index: usize, calc: &mut LegCalculation) {
    let leg = &legs[index].leg;
    let Some(fix) = ctx.fix(leg) else {
        finish(calc, 0, None);
        return;
    };
    let (course, mag_var) = ctx.true_course(leg, Some(&fix), &fix.location);
    calc.course_mag_var = mag_var;
    let start = LegStart { point: fix.location, course: None, from_aircraft: false };
    build_course_leg(ctx, leg, calc, &start, course, ctx.leg_distance_m(leg));
}

/// FM: from the fix along the course for the configured manual length.
pub fn calculate_fix_to_manual(ctx: &LegContext<'_>, legs: &[LegDefinition], index: usize, calc: &mut LegCalculation) {
    let leg = &legs[index].leg;
    let Some(fix) = ctx.fix(leg) else {
        finish(calc, 0, None);
        return;
    };
    let (course, mag_var) = ctx.true_course(leg, Some(&fix), &fix.location);
    calc.course_mag_var = mag_var;
    let start = LegStart { point: fix.location, course: None, from_aircraft: false };
    build_course_leg(ctx, leg, calc, &start, course, nm_to_meters(ctx.options.manual_leg_length_nm));
}

/// VM: turn onto the heading and fly it for the configured manual length.
pub fn calculate_heading_to_manual(
    ctx: &LegContext<'_>,
    legs: &[LegDefinition],
    index: usize,
    active_leg_index: usize,
    calc: &mut LegCalculation,
) {
    let leg = &legs[index].leg;
    let Some(start) = leg_start(ctx, legs, index, active_leg_index) else {
        finish(calc, 0, None);
        return;
    };
    let reference = ctx.navaid(leg);
    let (course, mag_var) = ctx.true_course(leg, reference.as_ref(), &start.point);
    calc.course_mag_var = mag_var;
    build_course_leg(ctx, leg, calc, &start, course, nm_to_meters(ctx.options.manual_leg_length_nm));
}
