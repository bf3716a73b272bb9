//! Fix-terminated straight legs: IF, TF, DF and CF.

use glam::DVec3;
use std::f64::consts::PI;
use tracing::{debug, warn};

use super::context::{finish, leg_start, mark_degraded, previous_end, LegContext, LegStart};
use super::model::{LegCalculation, LegDefinition};
use crate::builders::connect::{directed_radius, tangent_circles};
use crate::builders::{build_direct_to_point, build_turn_to_course, great_circle, intercept_point};
use crate::geo::{meters_to_rad, GeoCircle, GeoPoint, TurnDirection, GEO_CIRCLE_TOLERANCE};
use crate::path::{put_vector, FlightPathVector, VectorFlags};

/// Distance from a course line within which the previous leg counts as on course.
const ON_COURSE_TOLERANCE_M: f64 = 10.0;

/// Intercept angle used to join a course from off course.
const INTERCEPT_ANGLE: f64 = 45.0;

/// Great circle from `start` to `end`, logging instead of failing on
/// ambiguous antipodal input.
fn track_to(vectors: &mut Vec<FlightPathVector>, index: usize, start: &LegStart, end: &GeoPoint, flags: VectorFlags) -> usize {
    match great_circle::build(vectors, index, &start.point, end, start.course, flags) {
        Ok(count) => count,
        Err(err) => {
            warn!(%err, "track leg not built");
            0
        }
    }
}

/// The last `length_m` of the great circle along `course` ending at `fix`.
pub(super) fn course_line_into_fix(
    vectors: &mut Vec<FlightPathVector>,
    index: usize,
    fix: &GeoPoint,
    course: f64,
    length_m: f64,
    flags: VectorFlags,
) -> usize {
    let length = meters_to_rad(length_m);
    if length <= GEO_CIRCLE_TOLERANCE {
        return 0;
    }
    let f = fix.to_cartesian();
    let line = GeoCircle::from_point_course(f, course);
    let from = line.offset_distance_along(f, -length);
    put_vector(vectors, index, FlightPathVector::from_circle(&line, from, f, flags));
    1
}

/// IF and TF: a great circle from the previous leg's end to the fix. Without
/// a previous end (plan start, after a discontinuity) the leg is just its fix.
pub fn calculate_track_to_fix(ctx: &LegContext<'_>, legs: &[LegDefinition], index: usize, calc: &mut LegCalculation) {
    let leg = &legs[index].leg;
    let Some(fix) = ctx.fix(leg) else {
        finish(calc, 0, None);
        return;
    };
    calc.course_mag_var = crate::facility::course_mag_var(Some(&fix), &fix.location, ctx.mag_var);

    let count = match previous_end(legs, index) {
        Some(prev) => track_to(&mut calc.flight_path, 0, &prev, &fix.location, VectorFlags::NONE),
        None => 0,
    };
    finish(calc, count, Some(fix.location));
    calc.end = Some(fix.location);
}

/// DF: turn toward the fix from the current course, then fly straight to it.
pub fn calculate_direct_to_fix(
    ctx: &LegContext<'_>,
    legs: &[LegDefinition],
    index: usize,
    active_leg_index: usize,
    calc: &mut LegCalculation,
) {
    let leg = &legs[index].leg;
    let Some(fix) = ctx.fix(leg) else {
        finish(calc, 0, None);
        return;
    };
    calc.course_mag_var = crate::facility::course_mag_var(Some(&fix), &fix.location, ctx.mag_var);

    let Some(start) = leg_start(ctx, legs, index, active_leg_index) else {
        finish(calc, 0, Some(fix.location));
        return;
    };

    let count = match start.course {
        Some(course) => build_direct_to_point(
            &mut calc.flight_path,
            0,
            &start.point,
            course,
            &fix.location,
            ctx.leg_turn_radius(),
            leg.turn_direction,
            VectorFlags::NONE,
        ),
        None => track_to(&mut calc.flight_path, 0, &start, &fix.location, VectorFlags::DIRECT),
    };
    finish(calc, count, Some(fix.location));
}

/// CF: join the course to the fix, intercepting it from off course. When the
/// fix is already behind, fly direct to it instead and mark the leg degraded.
pub fn calculate_course_to_fix(ctx: &LegContext<'_>, legs: &[LegDefinition], index: usize, calc: &mut LegCalculation) {
    let leg = &legs[index].leg;
    let Some(fix) = ctx.fix(leg) else {
        finish(calc, 0, None);
        return;
    };
    let (course, mag_var) = ctx.true_course(leg, Some(&fix), &fix.location);
    calc.course_mag_var = mag_var;

    let f = fix.location.to_cartesian();
    let course_line = GeoCircle::from_point_course(f, course);

    let Some(start) = previous_end(legs, index) else {
        // no previous leg: the course line leading to the fix
        let count = course_line_into_fix(&mut calc.flight_path, 0, &fix.location, course, ctx.leg_distance_m(leg), VectorFlags::NONE);
        finish(calc, count, Some(fix.location));
        return;
    };

    let p = start.point.to_cartesian();
    let radius_m = ctx.leg_turn_radius();

    if course_line.distance(p).abs() <= meters_to_rad(ON_COURSE_TOLERANCE_M) {
        let along = course_line.angle_along(course_line.project(p), f, GEO_CIRCLE_TOLERANCE);
        if along > GEO_CIRCLE_TOLERANCE && along < PI {
            put_vector(&mut calc.flight_path, 0, FlightPathVector::from_circle(&course_line, p, f, VectorFlags::NONE));
            finish(calc, 1, Some(fix.location));
            return;
        }
        if along <= GEO_CIRCLE_TOLERANCE {
            finish(calc, 0, Some(fix.location));
            return;
        }
    } else if let Some(count) = build_course_intercept(&mut calc.flight_path, &start, &course_line, course, f, radius_m) {
        finish(calc, count, Some(fix.location));
        return;
    }

    warn!(fix = fix.ident.as_str(), "course to fix cannot be intercepted before the fix, flying direct");
    let start_course = start.course.unwrap_or_else(|| start.point.bearing_to(&fix.location));
    let count = build_direct_to_point(
        &mut calc.flight_path,
        0,
        &start.point,
        start_course,
        &fix.location,
        radius_m,
        None,
        VectorFlags::NONE,
    );
    let written = count.min(calc.flight_path.len());
    mark_degraded(&mut calc.flight_path[..written], 0);
    calc.degraded = true;
    finish(calc, count, Some(fix.location));
}

/// Off-course join: turn onto an intercept heading, fly it, turn onto the
/// course and track to `end`. `None` when the course can only be joined
/// beyond `end`.
fn build_course_intercept(
    vectors: &mut Vec<FlightPathVector>,
    start: &LegStart,
    course_line: &GeoCircle,
    course: f64,
    end: DVec3,
    radius_m: f64,
) -> Option<usize> {
    let p = start.point.to_cartesian();
    let left_of_course = course_line.distance(p) < 0.0;
    let (intercept_course, join_direction) = if left_of_course {
        (course + INTERCEPT_ANGLE, TurnDirection::Left)
    } else {
        (course - INTERCEPT_ANGLE, TurnDirection::Right)
    };

    let mut count = 0;
    if let Some(from) = start.course {
        let direction = TurnDirection::shortest(from, intercept_course);
        count += build_turn_to_course(vectors, 0, &start.point, radius_m, direction, from, intercept_course, VectorFlags::INTERCEPT);
    }
    let t = if count > 0 { vectors[count - 1].end_cartesian() } else { p };
    if (course_line.distance(t) < 0.0) != left_of_course {
        debug!("initial turn overshoots the course line");
        return None;
    }

    let intercept_line = GeoCircle::from_point_course(t, intercept_course);
    let hit = intercept_point(t, intercept_course, course_line)?;
    if course_line.angle_along(hit, end, GEO_CIRCLE_TOLERANCE) >= PI {
        return None;
    }

    let radius = directed_radius(meters_to_rad(radius_m), join_direction);
    let join = tangent_circles(&intercept_line, course_line, radius).closest_to(hit)?;
    if intercept_line.angle_along(t, join.from_point, GEO_CIRCLE_TOLERANCE) >= PI
        || course_line.angle_along(join.to_point, end, GEO_CIRCLE_TOLERANCE) >= PI
    {
        return None;
    }

    let segments = [
        (intercept_line, t, join.from_point, VectorFlags::INTERCEPT),
        (join.circle, join.from_point, join.to_point, VectorFlags::TURN_TO_COURSE),
        (*course_line, join.to_point, end, VectorFlags::NONE),
    ];
    for (circle, from, to, flags) in segments {
        if circle.distance_along(from, to, GEO_CIRCLE_TOLERANCE) > GEO_CIRCLE_TOLERANCE {
            put_vector(vectors, count, FlightPathVector::from_circle(&circle, from, to, flags));
            count += 1;
        }
    }
    Some(count)
}
