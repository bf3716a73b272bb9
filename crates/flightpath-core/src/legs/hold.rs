//! Holding patterns: entry followed by one racetrack circuit (HA, HF, HM).

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::context::{finish, previous_end, LegContext};
use super::model::{LegCalculation, LegDefinition};
use crate::builders::{build_direct_to_point, build_turn_to_course, build_turn_to_join_at_point, great_circle};
use crate::geo::{nm_to_meters, normalize_180, normalize_360, GeoPoint, TurnDirection};
use crate::path::utils::vector_final_course;
use crate::path::{last_written, FlightPathVector, VectorFlags};

/// Arrivals within this many degrees of the inbound course need no entry.
const ALIGNED_ENTRY_DEG: f64 = 5.0;

const TEARDROP_OFFSET_DEG: f64 = 30.0;

/// Altitude above which holds default to 1.5 minute legs, meters (14,000 ft).
const HIGH_HOLD_ALTITUDE_M: f64 = 4267.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldEntry {
    Direct,
    Teardrop,
    Parallel,
}

/// Entry procedure for arriving at the fix on `arrival_course` into a hold
/// with `inbound_course` and turns in `direction`.
pub fn hold_entry(arrival_course: f64, inbound_course: f64, direction: TurnDirection) -> HoldEntry {
    let mut relative = normalize_180(arrival_course - inbound_course);
    if direction == TurnDirection::Left {
        relative = -relative;
    }
    if (-110.0..70.0).contains(&relative) {
        HoldEntry::Direct
    } else if relative >= 70.0 {
        HoldEntry::Parallel
    } else {
        HoldEntry::Teardrop
    }
}

/// HA, HF and HM share one drawing: entry and a single circuit ending at the fix.
pub fn calculate_hold(ctx: &LegContext<'_>, legs: &[LegDefinition], index: usize, calc: &mut LegCalculation) {
    let leg = &legs[index].leg;
    let Some(fix) = ctx.fix(leg) else {
        finish(calc, 0, None);
        return;
    };
    let (inbound, mag_var) = ctx.true_course(leg, Some(&fix), &fix.location);
    calc.course_mag_var = mag_var;

    let direction = leg.turn_direction.unwrap_or(TurnDirection::Right);
    let radius_m = ctx.turn_radius(ctx.options.hold_bank_angle);
    let leg_length_m = if leg.distance > 0.0 && !leg.distance_minutes {
        nm_to_meters(leg.distance)
    } else {
        let minutes = if leg.distance > 0.0 {
            leg.distance
        } else if leg.altitude1 > HIGH_HOLD_ALTITUDE_M {
            1.5
        } else {
            1.0
        };
        nm_to_meters(minutes / 60.0 * ctx.speed_kt())
    };

    let vectors = &mut calc.flight_path;
    let mut count = 0;

    if let Some(start) = previous_end(legs, index) {
        let mut arrival = start.course;
        if start.point.distance_m(&fix.location) > 10.0 {
            count += match start.course {
                Some(course) => build_direct_to_point(
                    vectors,
                    count,
                    &start.point,
                    course,
                    &fix.location,
                    radius_m,
                    None,
                    VectorFlags::HOLD_ENTRY,
                ),
                None => great_circle::build(vectors, count, &start.point, &fix.location, None, VectorFlags::HOLD_ENTRY | VectorFlags::DIRECT)
                    .unwrap_or(0),
            };
            if count > 0 {
                arrival = Some(vector_final_course(&vectors[count - 1]));
            }
        }
        if let Some(arrival) = arrival {
            count += build_entry(vectors, count, &fix.location, arrival, inbound, direction, radius_m, leg_length_m);
        }
    }

    count += build_racetrack(vectors, count, &fix.location, inbound, direction, radius_m, leg_length_m);
    finish(calc, count, Some(fix.location));
    calc.end = Some(fix.location);
}

/// Entry vectors from the fix back to the fix, established inbound.
#[allow(clippy::too_many_arguments)]
fn build_entry(
    vectors: &mut Vec<FlightPathVector>,
    index: usize,
    fix: &GeoPoint,
    arrival: f64,
    inbound: f64,
    direction: TurnDirection,
    radius_m: f64,
    leg_length_m: f64,
) -> usize {
    let outbound = normalize_360(inbound + 180.0);
    let entry = hold_entry(arrival, inbound, direction);
    debug!(?entry, arrival, inbound, "hold entry");

    let flags = VectorFlags::HOLD_ENTRY;
    let (entry_course, first_turn, rejoin_turn) = match entry {
        HoldEntry::Direct => {
            if normalize_180(arrival - inbound).abs() < ALIGNED_ENTRY_DEG {
                return 0;
            }
            (outbound, direction, Some(direction))
        }
        HoldEntry::Teardrop => {
            let offset = match direction {
                TurnDirection::Right => -TEARDROP_OFFSET_DEG,
                TurnDirection::Left => TEARDROP_OFFSET_DEG,
            };
            let course = normalize_360(outbound + offset);
            (course, TurnDirection::shortest(arrival, course), Some(direction))
        }
        HoldEntry::Parallel => (outbound, TurnDirection::shortest(arrival, outbound), Some(direction.opposite())),
    };

    let mut count = build_turn_to_course(vectors, index, fix, radius_m, first_turn, arrival, entry_course, flags);
    let turn_end = last_written(vectors, index, count).map_or(*fix, |v| v.end);
    count += great_circle::build_from_course(vectors, index + count, &turn_end, entry_course, leg_length_m, flags);
    let Some(last) = last_written(vectors, index, count) else {
        return 0;
    };
    let (leg_end, leg_course) = (last.end, vector_final_course(last));

    let rejoin = build_turn_to_join_at_point(
        vectors,
        index + count,
        &leg_end,
        leg_course,
        fix,
        inbound,
        radius_m,
        rejoin_turn,
        None,
        flags,
    );
    if rejoin > 0 {
        return count + rejoin;
    }

    debug!(?entry, "hold entry cannot rejoin the inbound course, flying direct to the fix");
    count + build_direct_to_point(
        vectors,
        index + count,
        &leg_end,
        leg_course,
        fix,
        radius_m,
        rejoin_turn,
        flags | VectorFlags::DEGRADED,
    )
}

/// One circuit: turn outbound, outbound leg, turn inbound, inbound leg to the fix.
#[allow(clippy::too_many_arguments)]
fn build_racetrack(
    vectors: &mut Vec<FlightPathVector>,
    index: usize,
    fix: &GeoPoint,
    inbound: f64,
    direction: TurnDirection,
    radius_m: f64,
    leg_length_m: f64,
) -> usize {
    let flags = VectorFlags::HOLD_LEG;
    let outbound = normalize_360(inbound + 180.0);

    let mut count = build_turn_to_course(vectors, index, fix, radius_m, direction, inbound, outbound, flags);
    let abeam = last_written(vectors, index, count).map_or(*fix, |v| v.end);
    count += great_circle::build_from_course(vectors, index + count, &abeam, outbound, leg_length_m, flags);
    let outbound_end = last_written(vectors, index, count).map_or(abeam, |v| v.end);
    count += build_turn_to_course(vectors, index + count, &outbound_end, radius_m, direction, outbound, inbound, flags);
    let inbound_start = last_written(vectors, index, count).map_or(outbound_end, |v| v.end);
    count += great_circle::build(vectors, index + count, &inbound_start, fix, Some(inbound), flags).unwrap_or(0);
    count
}
