//! Turn anticipation between consecutive legs.
//!
//! Every boundary between two calculated legs whose paths meet is classified
//! as an anticipated turn (track to track, or involving an arc) or, for
//! course changes beyond the reversal threshold, a course reversal.
//! Anticipated turns are split at their bisector: the first half becomes the
//! egress of the first leg, the second half the ingress of the next one.
//! Course reversals live entirely in the ingress of the next leg.
//!
//! Turns claim part of the vectors they cut into. A turn never claims more
//! of a vector than an earlier turn left over; when it would, its radius
//! shrinks (or, with `readjust_previous_turns`, both turns shrink to share
//! the vector) and its vectors are flagged [`VectorFlags::DEGRADED`].

use glam::DVec3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::builders::connect::{directed_radius, tangent_circles, TangentCircle};
use crate::builders::build_turn_to_join_at_point;
use crate::config::FlightPathCalculatorOptions;
use crate::geo::{meters_to_rad, normalize_180, GeoPoint, TurnDirection, GEO_CIRCLE_TOLERANCE};
use crate::legs::{LegDefinition, LegDefinitionFlags};
use crate::path::utils::{
    distance_along_vector, max_turn_radius_for_anticipation, point_along_vector, vector_final_course,
    vector_initial_course, vector_turn_direction, vector_turn_radius_m,
};
use crate::path::{FlightPathVector, VectorFlags};

/// Legs whose paths end and start further apart than this are not joined.
const JUNCTION_TOLERANCE_M: f64 = 10.0;

/// Course changes below this are flown without a turn.
const MIN_TURN_DEG: f64 = 0.5;

/// Slack when checking whether a turn fits its vectors, meters.
const FIT_TOLERANCE_M: f64 = 0.01;

const MAX_FIT_ATTEMPTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnKind {
    TrackToTrack,
    CourseReversal,
    Arc,
}

/// The two vectors meeting at a leg boundary.
struct Junction {
    /// Last flight path vector of the first leg.
    from: FlightPathVector,
    from_index: usize,
    /// First flight path vector of the second leg.
    to: FlightPathVector,
    /// Length of `from` already claimed at its start by the previous turn.
    claimed: f64,
    course_change: f64,
    point: DVec3,
}

impl Junction {
    fn between(legs: &[LegDefinition], index: usize) -> Option<Self> {
        let first = legs.get(index)?;
        let second = legs.get(index + 1)?;
        if first.leg_type().is_discontinuity() || second.leg_type().is_discontinuity() {
            return None;
        }
        let a = first.calculated.as_ref()?;
        let b = second.calculated.as_ref()?;
        let from = a.flight_path.last()?.clone();
        let to = b.flight_path.first()?.clone();
        if from.end.distance_m(&to.start) > JUNCTION_TOLERANCE_M {
            return None;
        }

        let from_index = a.flight_path.len() - 1;
        let claimed = match a.ingress.last() {
            Some(ingress) if a.ingress_join_index == from_index => distance_along_vector(&from, &ingress.end).max(0.0),
            _ => 0.0,
        };
        let course_change = normalize_180(vector_initial_course(&to) - vector_final_course(&from));
        Some(Self {
            point: from.end_cartesian(),
            from,
            from_index,
            to,
            claimed,
            course_change,
        })
    }

    fn direction(&self) -> TurnDirection {
        if self.course_change > 0.0 {
            TurnDirection::Right
        } else {
            TurnDirection::Left
        }
    }

    fn solve(&self, radius_m: f64) -> Option<TangentCircle> {
        let radius = directed_radius(meters_to_rad(radius_m), self.direction());
        tangent_circles(&self.from.circle(), &self.to.circle(), radius).closest_to(self.point)
    }

    /// Anticipation claimed on each vector by `turn`: (on `from`, on `to`).
    fn claims(&self, turn: &TangentCircle) -> (f64, f64) {
        let on_from = self.from.distance - distance_along_vector(&self.from, &GeoPoint::from_cartesian(turn.from_point));
        let on_to = distance_along_vector(&self.to, &GeoPoint::from_cartesian(turn.to_point));
        (on_from, on_to)
    }
}

/// Builds leg-to-leg transitions for a run of legs.
#[derive(Debug, Clone)]
pub struct TurnCalculator {
    pub turn_radius_m: f64,
    pub reversal_radius_m: f64,
    pub max_course_reversal_angle: f64,
    pub readjust_previous_turns: bool,
}

impl TurnCalculator {
    pub fn new(options: &FlightPathCalculatorOptions, turn_radius_m: f64, reversal_radius_m: f64) -> Self {
        Self {
            turn_radius_m,
            reversal_radius_m,
            max_course_reversal_angle: options.max_course_reversal_angle,
            readjust_previous_turns: options.readjust_previous_turns,
        }
    }

    /// Rebuild transitions on every boundary from `from_index - 1` onward.
    pub fn compute_turns(&self, legs: &mut [LegDefinition], from_index: usize) {
        let first = from_index.saturating_sub(1);
        for (i, def) in legs.iter_mut().enumerate().skip(first) {
            let Some(calc) = def.calculated.as_mut() else {
                continue;
            };
            if i < from_index {
                calc.egress.clear();
                calc.egress_join_index = 0;
            } else {
                calc.clear_transitions();
            }
        }

        for index in first..legs.len().saturating_sub(1) {
            self.compute_boundary(legs, index, first);
        }
    }

    /// `first` is the earliest boundary being rebuilt; turns before it are
    /// left untouched even when readjustment is enabled.
    fn compute_boundary(&self, legs: &mut [LegDefinition], index: usize, first: usize) {
        let Some(junction) = Junction::between(legs, index) else {
            return;
        };
        if junction.course_change.abs() < MIN_TURN_DEG {
            return;
        }

        let both_straight = junction.from.is_great_circle() && junction.to.is_great_circle();
        if both_straight && junction.course_change.abs() > self.max_course_reversal_angle {
            self.course_reversal(legs, index, &junction);
        } else if starts_missed_approach(legs, index) {
            self.fly_over_turn(legs, index, &junction);
        } else {
            let kind = if both_straight { TurnKind::TrackToTrack } else { TurnKind::Arc };
            let may_readjust = self.readjust_previous_turns && index > first;
            self.anticipated_turn(legs, index, junction, kind, may_readjust);
        }
    }

    fn anticipated_turn(
        &self,
        legs: &mut [LegDefinition],
        index: usize,
        mut junction: Junction,
        kind: TurnKind,
        may_readjust: bool,
    ) {
        let mut radius_m = self.turn_radius_m;
        let mut degraded = false;

        for attempt in 0..MAX_FIT_ATTEMPTS {
            let Some(turn) = junction.solve(radius_m) else {
                debug!(index, ?kind, radius_m, "no tangent turn between legs, leaving the junction sharp");
                return;
            };
            let (on_from, on_to) = junction.claims(&turn);
            let available_from = junction.from.distance - junction.claimed;
            let available_to = junction.to.distance;

            if on_from < -FIT_TOLERANCE_M || on_to < -FIT_TOLERANCE_M {
                debug!(index, ?kind, "turn solution lies beyond the junction, skipped");
                return;
            }
            if on_from <= available_from + FIT_TOLERANCE_M && on_to <= available_to + FIT_TOLERANCE_M {
                debug!(index, ?kind, radius_m, anticipation = on_from, degraded, "leg to leg turn");
                apply_turn(legs, index, &junction, &turn, degraded);
                return;
            }

            if attempt == 0
                && may_readjust
                && junction.claimed > 0.0
                && on_from > available_from
                && self.share_with_previous_turn(legs, index, &junction, on_from)
            {
                if let Some(updated) = Junction::between(legs, index) {
                    junction = updated;
                }
            }

            let available_from = junction.from.distance - junction.claimed;
            radius_m = match kind {
                TurnKind::TrackToTrack => {
                    let limit = available_from.min(available_to).max(0.0);
                    max_turn_radius_for_anticipation(limit, junction.course_change).min(radius_m) * 0.999
                }
                _ => {
                    let scale = (available_from / on_from.max(f64::EPSILON))
                        .min(available_to / on_to.max(f64::EPSILON))
                        .clamp(0.0, 1.0);
                    radius_m * scale * 0.98
                }
            };
            degraded = true;
            if radius_m <= 1.0 {
                break;
            }
        }
        debug!(index, ?kind, "no turn fits between the legs, leaving the junction sharp");
    }

    /// Shrink the previous turn so that it and a turn needing `wanted` meters
    /// share the vector proportionally. Returns whether it was rebuilt.
    fn share_with_previous_turn(&self, legs: &mut [LegDefinition], index: usize, junction: &Junction, wanted: f64) -> bool {
        if index == 0 {
            return false;
        }
        let Some(previous) = legs[index]
            .calculated
            .as_ref()
            .and_then(|calc| calc.ingress.first())
            .filter(|v| v.flags.contains(VectorFlags::ANTICIPATED_TURN))
            .cloned()
        else {
            return false;
        };
        let Some(previous_junction) = Junction::between(legs, index - 1) else {
            return false;
        };
        if vector_turn_direction(&previous) != Some(previous_junction.direction()) {
            return false;
        }

        let share = junction.from.distance * junction.claimed / (junction.claimed + wanted);
        let radius_m = vector_turn_radius_m(&previous) * share / junction.claimed * 0.999;
        let Some(turn) = previous_junction.solve(radius_m) else {
            return false;
        };
        let (on_from, on_to) = previous_junction.claims(&turn);
        if on_from > previous_junction.from.distance - previous_junction.claimed + FIT_TOLERANCE_M
            || on_to > share + FIT_TOLERANCE_M
        {
            return false;
        }
        debug!(index = index - 1, radius_m, "previous turn readjusted to share its vector");
        apply_turn(legs, index - 1, &previous_junction, &turn, true);
        true
    }

    fn course_reversal(&self, legs: &mut [LegDefinition], index: usize, junction: &Junction) {
        let radius_m = self.reversal_radius_m;
        let flags = VectorFlags::COURSE_REVERSAL | VectorFlags::LEG_TO_LEG_TURN;
        if !rejoin_after_junction(legs, index, junction, radius_m, 3.0 * radius_m, flags) {
            debug!(index, "no room for a course reversal, leaving the junction sharp");
        }
    }

    /// The fix before a missed approach is flown over: the whole turn
    /// follows it, in the ingress of the missed approach leg.
    fn fly_over_turn(&self, legs: &mut [LegDefinition], index: usize, junction: &Junction) {
        let radius_m = self.turn_radius_m;
        if !rejoin_after_junction(legs, index, junction, radius_m, radius_m, VectorFlags::LEG_TO_LEG_TURN) {
            debug!(index, "no room to turn after the missed approach point, leaving the junction sharp");
        }
    }
}

/// True when `legs[index + 1]` is the first leg of the missed approach.
fn starts_missed_approach(legs: &[LegDefinition], index: usize) -> bool {
    let is_missed = |i: usize| legs.get(i).is_some_and(|def| def.flags.contains(LegDefinitionFlags::MISSED_APPROACH));
    is_missed(index + 1) && !is_missed(index)
}

/// Turn from the junction and rejoin the second leg's first vector, trying
/// rejoin points from `first_rejoin_m` along it. The turn becomes that leg's
/// ingress. Returns false when no rejoin point fits the vector.
fn rejoin_after_junction(
    legs: &mut [LegDefinition],
    index: usize,
    junction: &Junction,
    radius_m: f64,
    first_rejoin_m: f64,
    flags: VectorFlags,
) -> bool {
    let start = GeoPoint::from_cartesian(junction.point);
    let start_course = vector_final_course(&junction.from);

    let mut along = first_rejoin_m;
    while radius_m > 0.0 && along <= junction.to.distance {
        let target = point_along_vector(&junction.to, along);
        let target_course = junction.to.circle().bearing_at(target.to_cartesian());
        let mut vectors = Vec::new();
        let count = build_turn_to_join_at_point(
            &mut vectors,
            0,
            &start,
            start_course,
            &target,
            target_course,
            radius_m,
            Some(junction.direction()),
            None,
            flags,
        );
        if count > 0 {
            vectors.truncate(count);
            debug!(index, radius_m, rejoin = along, "turn after junction");
            if let Some(calc) = legs[index + 1].calculated.as_mut() {
                calc.ingress = vectors;
                calc.ingress_join_index = 0;
            }
            return true;
        }
        along += 2.0 * radius_m;
    }
    false
}

/// Split `turn` at its bisector into the egress of `legs[index]` and the
/// ingress of `legs[index + 1]`.
fn apply_turn(legs: &mut [LegDefinition], index: usize, junction: &Junction, turn: &TangentCircle, degraded: bool) {
    let mut flags = VectorFlags::LEG_TO_LEG_TURN | VectorFlags::ANTICIPATED_TURN;
    if degraded {
        flags |= VectorFlags::DEGRADED;
    }
    let sweep = turn.circle.angle_along(turn.from_point, turn.to_point, GEO_CIRCLE_TOLERANCE);
    let bisector = turn.circle.offset_angle_along(turn.from_point, sweep / 2.0);

    let first_half = FlightPathVector::from_circle(&turn.circle, turn.from_point, bisector, flags);
    let second_half = FlightPathVector::from_circle(&turn.circle, bisector, turn.to_point, flags);

    if let Some(calc) = legs[index].calculated.as_mut() {
        calc.egress.clear();
        calc.egress.push(first_half);
        calc.egress_join_index = junction.from_index;
    }
    if let Some(calc) = legs[index + 1].calculated.as_mut() {
        calc.ingress.clear();
        calc.ingress.push(second_half);
        calc.ingress_join_index = 0;
    }
}
