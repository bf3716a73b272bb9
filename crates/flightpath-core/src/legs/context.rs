//! Shared inputs and helpers for the leg calculators.

use tracing::warn;

use super::model::{FlightPlanLeg, LegCalculation, LegDefinition, LegType};
use crate::config::FlightPathCalculatorOptions;
use crate::facility::{course_mag_var, Facility, FacilityCache, MagVarSource};
use crate::geo::{normalize_360, GeoPoint, METERS_PER_NM};
use crate::path::utils::{turn_radius_m, vector_final_course, vector_initial_course};
use crate::path::{FlightPathVector, VectorFlags};
use crate::state::AircraftState;

const FEET_TO_METERS: f64 = 0.3048;
const MPS_PER_KNOT: f64 = METERS_PER_NM / 3600.0;

/// Everything a leg calculator may consult besides the legs themselves.
#[derive(Clone, Copy)]
pub struct LegContext<'a> {
    pub facilities: &'a dyn FacilityCache,
    pub mag_var: &'a dyn MagVarSource,
    pub options: &'a FlightPathCalculatorOptions,
    pub state: Option<&'a AircraftState>,
}

impl<'a> LegContext<'a> {
    /// Resolve a facility, logging when an identifier is given but unknown.
    pub fn facility(&self, ident: Option<&str>, leg_type: LegType) -> Option<Facility> {
        let ident = ident?;
        let facility = self.facilities.get(ident);
        if facility.is_none() {
            warn!(ident, leg = %leg_type, "unresolvable facility, leg left incomplete");
        }
        facility
    }

    /// Location of the leg's terminating fix.
    pub fn fix(&self, leg: &FlightPlanLeg) -> Option<Facility> {
        self.facility(leg.fix_ident.as_deref(), leg.leg_type)
    }

    /// Recommended navaid, falling back to the fix.
    pub fn navaid(&self, leg: &FlightPlanLeg) -> Option<Facility> {
        match leg.origin_ident.as_deref() {
            Some(ident) => self.facility(Some(ident), leg.leg_type),
            None => self.fix(leg),
        }
    }

    pub fn speed_kt(&self) -> f64 {
        self.state
            .map(|s| s.planning_speed(self.options))
            .unwrap_or(self.options.default_speed_kt)
    }

    pub fn climb_rate_fpm(&self) -> f64 {
        self.state
            .map(|s| s.planning_climb_rate(self.options))
            .unwrap_or(self.options.default_climb_rate_fpm)
    }

    pub fn turn_radius(&self, bank_deg: f64) -> f64 {
        match self.state {
            Some(state) => state.turn_radius(self.options, bank_deg),
            None => turn_radius_m(self.options.default_speed_kt, self.options.limited_bank(bank_deg)),
        }
    }

    /// Radius for turns that are part of a leg's own geometry.
    pub fn leg_turn_radius(&self) -> f64 {
        self.turn_radius(self.options.bank_angle)
    }

    /// True course of `leg` and the magnetic variation applied to it. The
    /// variation comes from `reference` when it declares one.
    pub fn true_course(&self, leg: &FlightPlanLeg, reference: Option<&Facility>, at: &GeoPoint) -> (f64, f64) {
        let mag_var = course_mag_var(reference, at, self.mag_var);
        if leg.true_degrees {
            (normalize_360(leg.course), mag_var)
        } else {
            (normalize_360(leg.course + mag_var), mag_var)
        }
    }

    /// Leg distance in meters, converting minutes at the planning speed.
    pub fn leg_distance_m(&self, leg: &FlightPlanLeg) -> f64 {
        if leg.distance_minutes {
            leg.distance / 60.0 * self.speed_kt() * METERS_PER_NM
        } else {
            leg.distance * METERS_PER_NM
        }
    }

    /// Ground distance to climb from `from_alt` to `to_alt` (meters).
    pub fn climb_distance_m(&self, from_alt: f64, to_alt: f64) -> f64 {
        let delta = to_alt - from_alt;
        if delta <= 0.0 {
            return 0.0;
        }
        let rate_mps = self.climb_rate_fpm() * FEET_TO_METERS / 60.0;
        delta / rate_mps * self.speed_kt() * MPS_PER_KNOT
    }
}

/// Where a leg's path begins.
#[derive(Debug, Clone, Copy)]
pub struct LegStart {
    pub point: GeoPoint,
    /// Course flown at `point`, when known.
    pub course: Option<f64>,
    pub from_aircraft: bool,
}

/// End point and final course of the previous leg, if it has any.
pub fn previous_end(legs: &[LegDefinition], index: usize) -> Option<LegStart> {
    let prev = legs.get(index.checked_sub(1)?)?;
    if prev.leg_type().is_discontinuity() {
        return None;
    }
    let calc = prev.calculated.as_ref()?;
    Some(LegStart {
        point: calc.end?,
        course: calc.flight_path.last().map(vector_final_course),
        from_aircraft: false,
    })
}

/// Start of the leg at `index`: the aircraft for active legs that begin
/// wherever the aircraft is, otherwise the previous leg's end.
pub fn leg_start(ctx: &LegContext<'_>, legs: &[LegDefinition], index: usize, active_leg_index: usize) -> Option<LegStart> {
    let leg = &legs[index].leg;
    if index == active_leg_index && leg.leg_type.starts_from_aircraft() {
        if let Some(state) = ctx.state {
            return Some(LegStart {
                point: state.position,
                course: Some(state.track),
                from_aircraft: true,
            });
        }
    }
    previous_end(legs, index)
}

/// Altitude the aircraft is expected at when starting the leg at `index`.
pub fn estimated_start_altitude(ctx: &LegContext<'_>, legs: &[LegDefinition], index: usize) -> f64 {
    let current = ctx.state.map(|s| s.altitude).unwrap_or(0.0);
    let planned = legs[..index]
        .iter()
        .rev()
        .find_map(|def| {
            if def.vertical.altitude1 > 0.0 {
                Some(def.vertical.altitude1)
            } else if matches!(def.leg_type(), LegType::Ca | LegType::Fa | LegType::Va | LegType::Ha) {
                Some(def.leg.altitude1)
            } else {
                None
            }
        })
        .unwrap_or(0.0);
    current.max(planned)
}

/// Trim the leg's vectors to `count` and derive start, end and DTK from them.
/// Without vectors, `fallback` supplies both ends.
pub fn finish(calc: &mut LegCalculation, count: usize, fallback: Option<GeoPoint>) {
    calc.flight_path.truncate(count);
    match (calc.flight_path.first(), calc.flight_path.last()) {
        (Some(first), Some(last)) => {
            calc.start = Some(first.start);
            calc.end = Some(last.end);
            calc.initial_dtk = Some(vector_initial_course(first));
        }
        _ => {
            calc.start = fallback;
            calc.end = fallback;
            calc.initial_dtk = None;
        }
    }
    calc.degraded |= calc.flight_path.iter().any(|v| v.flags.contains(VectorFlags::DEGRADED));
}

/// Mark every vector from `from` on as degraded.
pub fn mark_degraded(vectors: &mut [FlightPathVector], from: usize) {
    for vector in vectors.iter_mut().skip(from) {
        vector.flags.insert(VectorFlags::DEGRADED);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facility::{FacilityStore, NoMagVar};

    #[test]
    fn test_climb_distance() {
        let facilities = FacilityStore::new();
        let options = FlightPathCalculatorOptions {
            default_speed_kt: 120.0,
            default_climb_rate_fpm: 1000.0,
            ..Default::default()
        };
        let ctx = LegContext {
            facilities: &facilities,
            mag_var: &NoMagVar,
            options: &options,
            state: None,
        };
        // 1000 ft at 1000 fpm takes one minute, i.e. 2 nm at 120 kt
        let d = ctx.climb_distance_m(0.0, 1000.0 * FEET_TO_METERS);
        assert!((d - 2.0 * METERS_PER_NM).abs() < 0.5, "climb distance {d}");
        assert_eq!(ctx.climb_distance_m(500.0, 100.0), 0.0);
    }

    #[test]
    fn test_magnetic_course_converted() {
        let facilities = FacilityStore::new();
        let options = FlightPathCalculatorOptions::default();
        let ctx = LegContext {
            facilities: &facilities,
            mag_var: &crate::facility::ConstantMagVar(10.0),
            options: &options,
            state: None,
        };
        let leg = FlightPlanLeg::new(LegType::Cf).course(355.0, false);
        let (course, var) = ctx.true_course(&leg, None, &GeoPoint::new(0.0, 0.0));
        assert!((course - 5.0).abs() < 1e-9);
        assert_eq!(var, 10.0);
    }
}
