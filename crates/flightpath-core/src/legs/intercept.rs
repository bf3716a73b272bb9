//! Course legs terminated by meeting a circle: FD, CD, VD, CR, VR, CI, VI.
//!
//! When the course never reaches the terminating circle the leg flies
//! direct to the circle's closest point instead. That path does not match
//! the published procedure, so the leg is marked degraded and its fallback
//! vectors carry [`VectorFlags::DEGRADED`].

use glam::DVec3;
use std::f64::consts::PI;
use tracing::warn;

use super::context::{finish, leg_start, mark_degraded, LegContext, LegStart};
use super::course::{apply_heading, turn_onto_course};
use super::model::{LegCalculation, LegDefinition, LegType};
use crate::builders::circle::arc_circle;
use crate::builders::{build_direct_to_point, great_circle, intercept_point};
use crate::facility::course_mag_var;
use crate::geo::{meters_to_rad, nm_to_meters, GeoCircle, GeoPoint, TurnDirection, GEO_CIRCLE_TOLERANCE};
use crate::path::{put_vector, FlightPathVector, VectorFlags};

/// Fly `course` from `start` until it meets `target` at a point accepted by
/// `accept`; fall back to a direct path to the closest point of `target`.
fn build_course_to_circle(
    ctx: &LegContext<'_>,
    calc: &mut LegCalculation,
    start: &LegStart,
    course: f64,
    turn_direction: Option<TurnDirection>,
    target: &GeoCircle,
    accept: impl Fn(DVec3) -> bool,
) -> usize {
    let radius_m = ctx.leg_turn_radius();
    let (mut count, from, _) = turn_onto_course(&mut calc.flight_path, start, course, radius_m, turn_direction);
    let p = from.to_cartesian();
    if target.includes(p, GEO_CIRCLE_TOLERANCE) {
        return count;
    }

    if let Some(hit) = intercept_point(p, course, target).filter(|hit| accept(*hit)) {
        let path = GeoCircle::from_point_course(p, course);
        put_vector(&mut calc.flight_path, count, FlightPathVector::from_circle(&path, p, hit, VectorFlags::INTERCEPT));
        return count + 1;
    }

    warn!(course, "course never meets its terminating circle, flying direct to the closest point");
    let Some(closest) = target.closest(p) else {
        return count;
    };
    let fallback = build_direct_to_point(
        &mut calc.flight_path,
        count,
        &from,
        course,
        &GeoPoint::from_cartesian(closest),
        radius_m,
        None,
        VectorFlags::NONE,
    );
    mark_degraded(&mut calc.flight_path[..count + fallback], count);
    calc.degraded = true;
    count += fallback;
    count
}

/// FD, CD and VD: until a DME distance from the recommended navaid.
pub fn calculate_to_dme(
    ctx: &LegContext<'_>,
    legs: &[LegDefinition],
    index: usize,
    active_leg_index: usize,
    calc: &mut LegCalculation,
) {
    let leg = &legs[index].leg;
    let Some(navaid) = ctx.navaid(leg) else {
        finish(calc, 0, None);
        return;
    };
    let start = if leg.leg_type == LegType::Fd {
        ctx.fix(leg).map(|fix| LegStart { point: fix.location, course: None, from_aircraft: false })
    } else {
        leg_start(ctx, legs, index, active_leg_index)
    };
    let Some(start) = start else {
        finish(calc, 0, None);
        return;
    };

    let (course, mag_var) = ctx.true_course(leg, Some(&navaid), &start.point);
    calc.course_mag_var = mag_var;
    let ring = GeoCircle::new(navaid.location.to_cartesian(), meters_to_rad(nm_to_meters(leg.distance)));

    let count = build_course_to_circle(ctx, calc, &start, course, leg.turn_direction, &ring, |_| true);
    apply_heading(&mut calc.flight_path[..count], leg);
    finish(calc, count, Some(start.point));
}

/// CR and VR: until the radial `theta` of the recommended navaid.
pub fn calculate_to_radial(
    ctx: &LegContext<'_>,
    legs: &[LegDefinition],
    index: usize,
    active_leg_index: usize,
    calc: &mut LegCalculation,
) {
    let leg = &legs[index].leg;
    let (Some(navaid), Some(start)) = (ctx.navaid(leg), leg_start(ctx, legs, index, active_leg_index)) else {
        finish(calc, 0, None);
        return;
    };

    let (course, mag_var) = ctx.true_course(leg, Some(&navaid), &start.point);
    calc.course_mag_var = mag_var;
    let station = navaid.location.to_cartesian();
    let radial_course = leg.theta + course_mag_var(Some(&navaid), &navaid.location, ctx.mag_var);
    let radial = GeoCircle::from_point_course(station, radial_course);

    // only the half of the great circle leaving the station on the radial
    let count = build_course_to_circle(ctx, calc, &start, course, leg.turn_direction, &radial, |hit| {
        radial.angle_along(station, hit, GEO_CIRCLE_TOLERANCE) < PI
    });
    apply_heading(&mut calc.flight_path[..count], leg);
    finish(calc, count, Some(start.point));
}

/// CI and VI: until the path of the following leg.
pub fn calculate_to_intercept(
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

    let count = match next_leg_path(ctx, legs, index) {
        Some(target) => build_course_to_circle(ctx, calc, &start, course, leg.turn_direction, &target, |_| true),
        None => {
            warn!(leg = %leg.leg_type, "no path to intercept after this leg, drawing a manual length");
            let (turn, from, _) = turn_onto_course(&mut calc.flight_path, &start, course, ctx.leg_turn_radius(), leg.turn_direction);
            let straight = great_circle::build_from_course(
                &mut calc.flight_path,
                turn,
                &from,
                course,
                nm_to_meters(ctx.options.manual_leg_length_nm),
                VectorFlags::NONE,
            );
            mark_degraded(&mut calc.flight_path[..turn + straight], turn);
            calc.degraded = true;
            turn + straight
        }
    };
    apply_heading(&mut calc.flight_path[..count], leg);
    finish(calc, count, Some(start.point));
}

/// Circle along which the leg after `index` is flown, when it has one that
/// does not depend on where the leg at `index` ends.
pub(super) fn next_leg_path(ctx: &LegContext<'_>, legs: &[LegDefinition], index: usize) -> Option<GeoCircle> {
    let next = &legs.get(index + 1)?.leg;
    match next.leg_type {
        LegType::Cf | LegType::Fa | LegType::Fc | LegType::Fd | LegType::Fm => {
            let fix = ctx.fix(next)?;
            let (course, _) = ctx.true_course(next, Some(&fix), &fix.location);
            Some(GeoCircle::from_point_course(fix.location.to_cartesian(), course))
        }
        LegType::Rf => {
            let center = ctx.facility(next.arc_center_ident.as_deref(), next.leg_type)?;
            let fix = ctx.fix(next)?;
            let direction = next.turn_direction.unwrap_or(TurnDirection::Right);
            arc_circle(direction, center.location.distance_m(&fix.location), &center.location).ok()
        }
        LegType::Af => {
            let navaid = ctx.navaid(next)?;
            let direction = next.turn_direction.unwrap_or(TurnDirection::Right);
            arc_circle(direction, nm_to_meters(next.rho), &navaid.location).ok()
        }
        _ => None,
    }
}
