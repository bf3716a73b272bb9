//! Paths chosen by the crew rather than the procedure: direct-to targets,
//! OBS courses and vectors to final.
//!
//! Each calculator returns `false` when the leg should be calculated by its
//! leg type as usual.

use tracing::debug;

use super::context::{finish, mark_degraded, previous_end, LegContext, LegStart};
use super::model::{LegCalculation, LegDefinition, LegDefinitionFlags};
use super::track::course_line_into_fix;
use crate::builders::{build_direct_to_point, build_turn_to_join_at_point, great_circle};
use crate::facility::course_mag_var;
use crate::geo::{nm_to_meters, GeoPoint, TurnDirection};
use crate::path::{FlightPathVector, VectorFlags};

/// Apply whichever crew selection the leg at `index` carries.
pub fn calculate_selected(
    ctx: &LegContext<'_>,
    legs: &[LegDefinition],
    index: usize,
    active_leg_index: usize,
    calc: &mut LegCalculation,
) -> bool {
    let def = &legs[index];
    let leg_type = def.leg_type();
    // a selection needs a terminating fix; holds keep their own entry
    if leg_type.has_floating_end() || leg_type.is_hold() || leg_type.is_discontinuity() {
        return false;
    }
    let active = index == active_leg_index;
    if def.flags.contains(LegDefinitionFlags::DIRECT_TO_TARGET) && active {
        calculate_direct_to_target(ctx, def, calc)
    } else if def.flags.contains(LegDefinitionFlags::OBS) && def.selected_course.is_some() {
        calculate_obs(ctx, legs, index, active, calc)
    } else if def.flags.contains(LegDefinitionFlags::VECTORS_TO_FINAL) && active {
        calculate_vectors_to_final(ctx, def, calc)
    } else {
        false
    }
}

fn aircraft_start(ctx: &LegContext<'_>) -> Option<LegStart> {
    ctx.state.map(|state| LegStart {
        point: state.position,
        course: Some(state.track),
        from_aircraft: true,
    })
}

/// From the aircraft to the fix, joining the selected course into it when
/// there is one.
fn calculate_direct_to_target(ctx: &LegContext<'_>, def: &LegDefinition, calc: &mut LegCalculation) -> bool {
    let (Some(start), Some(fix)) = (aircraft_start(ctx), ctx.fix(&def.leg)) else {
        return false;
    };
    calc.course_mag_var = course_mag_var(Some(&fix), &fix.location, ctx.mag_var);
    let count = join_fix(ctx, calc, &start, &fix.location, def.selected_course, def.leg.turn_direction);
    finish(calc, count, Some(fix.location));
    true
}

/// The selected course into the fix. Flown from the aircraft when active,
/// joined from the previous leg otherwise. Without either it is the last
/// manual leg length of the course line.
fn calculate_obs(
    ctx: &LegContext<'_>,
    legs: &[LegDefinition],
    index: usize,
    active: bool,
    calc: &mut LegCalculation,
) -> bool {
    let def = &legs[index];
    let (Some(fix), Some(course)) = (ctx.fix(&def.leg), def.selected_course) else {
        return false;
    };
    calc.course_mag_var = course_mag_var(Some(&fix), &fix.location, ctx.mag_var);

    let start = aircraft_start(ctx).filter(|_| active).or_else(|| previous_end(legs, index));
    let count = match start {
        Some(start) => join_fix(ctx, calc, &start, &fix.location, Some(course), def.leg.turn_direction),
        None => {
            let length_m = nm_to_meters(ctx.options.manual_leg_length_nm);
            course_line_into_fix(&mut calc.flight_path, 0, &fix.location, course, length_m, VectorFlags::NONE)
        }
    };
    finish(calc, count, Some(fix.location));
    true
}

/// From the aircraft onto the final course at the fix.
fn calculate_vectors_to_final(ctx: &LegContext<'_>, def: &LegDefinition, calc: &mut LegCalculation) -> bool {
    let (Some(start), Some(fix)) = (aircraft_start(ctx), ctx.fix(&def.leg)) else {
        return false;
    };
    let (course, mag_var) = ctx.true_course(&def.leg, Some(&fix), &fix.location);
    calc.course_mag_var = mag_var;
    let count = join_fix(ctx, calc, &start, &fix.location, Some(course), def.leg.turn_direction);
    finish(calc, count, Some(fix.location));
    true
}

/// Turn, fly straight and turn again to arrive at `fix` on `course`. When
/// that cannot be built, or no course is given, fly direct to the fix; the
/// fallback for a missed join is degraded.
fn join_fix(
    ctx: &LegContext<'_>,
    calc: &mut LegCalculation,
    start: &LegStart,
    fix: &GeoPoint,
    course: Option<f64>,
    direction: Option<TurnDirection>,
) -> usize {
    let radius_m = ctx.leg_turn_radius();
    let Some(start_course) = start.course else {
        return direct_without_course(&mut calc.flight_path, &start.point, fix);
    };

    if let Some(course) = course {
        let count = build_turn_to_join_at_point(
            &mut calc.flight_path,
            0,
            &start.point,
            start_course,
            fix,
            course,
            radius_m,
            direction,
            None,
            VectorFlags::NONE,
        );
        if count > 0 {
            return count;
        }
        debug!(course, "course into the fix cannot be joined, flying direct");
        let count = build_direct_to_point(&mut calc.flight_path, 0, &start.point, start_course, fix, radius_m, direction, VectorFlags::DIRECT);
        let written = count.min(calc.flight_path.len());
        mark_degraded(&mut calc.flight_path[..written], 0);
        return count;
    }

    build_direct_to_point(&mut calc.flight_path, 0, &start.point, start_course, fix, radius_m, direction, VectorFlags::DIRECT)
}

fn direct_without_course(vectors: &mut Vec<FlightPathVector>, start: &GeoPoint, fix: &GeoPoint) -> usize {
    great_circle::build(vectors, 0, start, fix, None, VectorFlags::DIRECT).unwrap_or_else(|err| {
        debug!(%err, "direct path not built");
        0
    })
}
