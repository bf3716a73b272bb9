//! PI: 45/180 procedure turn onto the following leg's inbound course.

use super::context::{finish, previous_end, LegContext};
use super::intercept::next_leg_path;
use super::model::{LegCalculation, LegDefinition};
use crate::builders::{build_direct_to_point, procedure_turn, ProcedureTurnParams};
use crate::geo::{nm_to_meters, normalize_180, normalize_360, GeoCircle, TurnDirection};
use crate::path::utils::vector_final_course;
use crate::path::VectorFlags;

pub fn calculate_procedure_turn(ctx: &LegContext<'_>, legs: &[LegDefinition], index: usize, calc: &mut LegCalculation) {
    let leg = &legs[index].leg;
    let Some(fix) = ctx.fix(leg) else {
        finish(calc, 0, None);
        return;
    };
    let (outbound_course, mag_var) = ctx.true_course(leg, Some(&fix), &fix.location);
    calc.course_mag_var = mag_var;

    let f = fix.location.to_cartesian();
    let inbound = next_leg_path(ctx, legs, index)
        .map(|path| GeoCircle::from_point_course(f, path.bearing_at(path.project(f))))
        .unwrap_or_else(|| GeoCircle::from_point_course(f, outbound_course + 180.0 + 45.0));
    let inbound_course = inbound.bearing_at(f);
    let radius_m = ctx.turn_radius(ctx.options.course_reversal_bank_angle);
    let flags = VectorFlags::COURSE_REVERSAL;

    let mut count = 0;
    let mut arrival = None;
    if let Some(start) = previous_end(legs, index) {
        arrival = start.course;
        if start.point.distance_m(&fix.location) > 10.0 {
            let course = start.course.unwrap_or_else(|| start.point.bearing_to(&fix.location));
            count += build_direct_to_point(&mut calc.flight_path, 0, &start.point, course, &fix.location, radius_m, None, flags);
            if count > 0 {
                arrival = Some(vector_final_course(&calc.flight_path[count - 1]));
            }
        }
    }

    // the 180 degree turn goes the other way from the turn onto the outbound course
    let reciprocal = normalize_360(inbound_course + 180.0);
    let turn_direction = leg.turn_direction.unwrap_or(if normalize_180(outbound_course - reciprocal) < 0.0 {
        TurnDirection::Right
    } else {
        TurnDirection::Left
    });

    let one_minute_m = nm_to_meters(ctx.speed_kt() / 60.0);
    let outbound_distance_m = if leg.distance > 0.0 {
        one_minute_m.min(ctx.leg_distance_m(leg) / 2.0)
    } else {
        one_minute_m
    };

    let params = ProcedureTurnParams {
        start: fix.location,
        start_course: arrival.unwrap_or(reciprocal),
        outbound_course,
        outbound_distance_m,
        turn_direction,
        inbound,
        radius_m,
    };
    count += procedure_turn::build(&mut calc.flight_path, count, &params, flags);
    finish(calc, count, Some(fix.location));
}
