//! Flight path calculation over a sequence of legs.

use std::sync::Arc;

use tracing::debug;

use crate::config::FlightPathCalculatorOptions;
use crate::facility::{FacilityCache, MagVarSource};
use crate::legs::{calculate_leg, LegContext, LegDefinition};
use crate::path::utils::{path_length, resolve_ingress_to_egress};
use crate::state::AircraftState;
use crate::turns::TurnCalculator;

/// Computes leg geometry, leg-to-leg turns and distances in one pass.
#[derive(Clone)]
pub struct FlightPathCalculator {
    options: FlightPathCalculatorOptions,
    facilities: Arc<dyn FacilityCache>,
    mag_var: Arc<dyn MagVarSource>,
}

impl FlightPathCalculator {
    pub fn new(
        facilities: Arc<dyn FacilityCache>,
        mag_var: Arc<dyn MagVarSource>,
        options: FlightPathCalculatorOptions,
    ) -> Self {
        Self {
            options: options.validated(),
            facilities,
            mag_var,
        }
    }

    pub fn options(&self) -> &FlightPathCalculatorOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: FlightPathCalculatorOptions) {
        self.options = options.validated();
    }

    /// Recalculate `legs` from `from_index` to the end.
    ///
    /// Legs before `from_index` keep their geometry; the transition leaving
    /// the leg just before it is rebuilt since it depends on the legs after.
    /// `state` only affects legs starting from the aircraft and the radii
    /// used for turns.
    pub fn calculate(
        &self,
        legs: &mut [LegDefinition],
        from_index: usize,
        active_leg_index: usize,
        state: Option<&AircraftState>,
    ) {
        let from_index = from_index.min(legs.len());
        let ctx = LegContext {
            facilities: self.facilities.as_ref(),
            mag_var: self.mag_var.as_ref(),
            options: &self.options,
            state,
        };

        for index in from_index..legs.len() {
            let keep_active = self.options.skip_active_leg_recalculation
                && index == active_leg_index
                && legs[index].calculated.as_ref().is_some_and(|calc| calc.has_geometry());
            if keep_active {
                debug!(index, "active leg geometry kept");
                continue;
            }

            let mut calc = legs[index].calculated.take().unwrap_or_default();
            calculate_leg(&ctx, legs, index, active_leg_index, &mut calc);
            legs[index].calculated = Some(calc);
        }

        let turns = TurnCalculator::new(
            &self.options,
            ctx.turn_radius(self.options.turn_anticipation_bank_angle),
            ctx.turn_radius(self.options.course_reversal_bank_angle),
        );
        turns.compute_turns(legs, from_index);

        let first = from_index.saturating_sub(1);
        for def in legs.iter_mut().skip(first) {
            if let Some(calc) = def.calculated.as_mut() {
                resolve_ingress_to_egress(calc);
            }
        }
        update_distances(legs, first);

        debug!(from_index, legs = legs.len(), "flight path calculated");
    }
}

/// Refresh leg and cumulative distances from `from_index` onward.
fn update_distances(legs: &mut [LegDefinition], from_index: usize) {
    let (mut cumulative, mut cumulative_with_transitions) = legs[..from_index]
        .iter()
        .rev()
        .find_map(|def| def.calculated.as_ref())
        .map(|calc| (calc.cumulative_distance, calc.cumulative_distance_with_transitions))
        .unwrap_or((0.0, 0.0));

    for def in legs.iter_mut().skip(from_index) {
        let Some(calc) = def.calculated.as_mut() else {
            continue;
        };
        calc.distance = path_length(&calc.flight_path);
        calc.distance_with_transitions = path_length(&calc.ingress_to_egress);
        cumulative += calc.distance;
        cumulative_with_transitions += calc.distance_with_transitions;
        calc.cumulative_distance = cumulative;
        calc.cumulative_distance_with_transitions = cumulative_with_transitions;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facility::{Facility, FacilityKind, FacilityStore, NoMagVar};
    use crate::geo::GeoPoint;
    use crate::legs::{FlightPlanLeg, LegType};

    fn calculator(options: FlightPathCalculatorOptions) -> FlightPathCalculator {
        let store: FacilityStore = [
            Facility::new("AAA", FacilityKind::Waypoint, GeoPoint::new(0.0, 0.0)),
            Facility::new("BBB", FacilityKind::Waypoint, GeoPoint::new(0.0, 0.3)),
            Facility::new("CCC", FacilityKind::Waypoint, GeoPoint::new(-0.3, 0.3)),
        ]
        .into_iter()
        .collect();
        FlightPathCalculator::new(Arc::new(store), Arc::new(NoMagVar), options)
    }

    fn route() -> Vec<LegDefinition> {
        vec![
            FlightPlanLeg::new(LegType::If).fix("AAA").into(),
            FlightPlanLeg::new(LegType::Tf).fix("BBB").into(),
            FlightPlanLeg::new(LegType::Tf).fix("CCC").into(),
        ]
    }

    #[test]
    fn test_cumulative_distances() {
        let calc = calculator(FlightPathCalculatorOptions::default());
        let mut legs = route();
        calc.calculate(&mut legs, 0, 1, None);

        let results: Vec<_> = legs.iter().map(|l| l.calculated.as_ref().unwrap()).collect();
        assert_eq!(results[0].distance, 0.0);
        let expected = GeoPoint::new(0.0, 0.0).distance_m(&GeoPoint::new(0.0, 0.3));
        assert!((results[1].distance - expected).abs() < 0.01);
        assert!((results[2].cumulative_distance - results[1].distance - results[2].distance).abs() < 1e-6);
        assert!(results[1].cumulative_distance_with_transitions <= results[2].cumulative_distance_with_transitions);
        // the corner at BBB is cut short
        assert!(results[1].distance_with_transitions < results[1].distance);
    }

    #[test]
    fn test_partial_recalculation_keeps_earlier_legs() {
        let calc = calculator(FlightPathCalculatorOptions::default());
        let mut legs = route();
        calc.calculate(&mut legs, 0, 1, None);
        let before = legs[1].calculated.clone();

        legs[2] = FlightPlanLeg::new(LegType::Tf).fix("AAA").into();
        calc.calculate(&mut legs, 2, 1, None);
        let after = legs[1].calculated.as_ref().unwrap();
        assert_eq!(before.as_ref().unwrap().flight_path, after.flight_path);
        // the transition out of leg 1 follows the new leg 2
        assert_ne!(before.as_ref().unwrap().egress, after.egress);
    }

    #[test]
    fn test_partial_recalculation_with_readjusted_turns_is_stable() {
        let b = GeoPoint::new(0.0, 0.3);
        let c = b.offset_m(180.0, 1500.0);
        let d = c.offset_m(90.0, 20_000.0);
        let store: FacilityStore = [
            Facility::new("AAA", FacilityKind::Waypoint, GeoPoint::new(0.0, 0.0)),
            Facility::new("BBB", FacilityKind::Waypoint, b),
            Facility::new("CCC", FacilityKind::Waypoint, c),
            Facility::new("DDD", FacilityKind::Waypoint, d),
        ]
        .into_iter()
        .collect();
        let options = FlightPathCalculatorOptions {
            readjust_previous_turns: true,
            ..Default::default()
        };
        let calc = FlightPathCalculator::new(Arc::new(store), Arc::new(NoMagVar), options);
        let state = AircraftState {
            position: GeoPoint::new(0.0, 0.0),
            track: 90.0,
            altitude: 3000.0,
            ground_speed: 250.0,
            true_airspeed: 250.0,
            climb_rate: 0.0,
            desired_turn_radius: Some(1000.0),
        };
        let mut legs: Vec<LegDefinition> = vec![
            FlightPlanLeg::new(LegType::If).fix("AAA").into(),
            FlightPlanLeg::new(LegType::Tf).fix("BBB").into(),
            FlightPlanLeg::new(LegType::Tf).fix("CCC").into(),
            FlightPlanLeg::new(LegType::Tf).fix("DDD").into(),
        ];
        calc.calculate(&mut legs, 0, 1, Some(&state));
        let kept = legs[1].calculated.clone();

        calc.calculate(&mut legs, 3, 1, Some(&state));
        let once: Vec<_> = legs.iter().map(|l| l.calculated.clone()).collect();
        calc.calculate(&mut legs, 3, 1, Some(&state));
        let twice: Vec<_> = legs.iter().map(|l| l.calculated.clone()).collect();

        assert_eq!(legs[1].calculated, kept);
        assert_eq!(once, twice);
        for def in &legs {
            let calc = def.calculated.as_ref().unwrap();
            if let Some(egress) = calc.egress.last() {
                assert_eq!(calc.ingress_to_egress.last(), Some(egress));
            }
        }
    }

    #[test]
    fn test_active_leg_kept_when_skipping() {
        let options = FlightPathCalculatorOptions {
            skip_active_leg_recalculation: true,
            ..Default::default()
        };
        let calc = calculator(options);
        let mut legs = route();
        calc.calculate(&mut legs, 0, 1, None);
        let kept = legs[1].calculated.as_ref().unwrap().flight_path.clone();

        let state = AircraftState {
            position: GeoPoint::new(0.01, 0.1),
            track: 90.0,
            altitude: 1000.0,
            ground_speed: 200.0,
            true_airspeed: 200.0,
            climb_rate: 0.0,
            desired_turn_radius: None,
        };
        calc.calculate(&mut legs, 1, 1, Some(&state));
        assert_eq!(legs[1].calculated.as_ref().unwrap().flight_path, kept);
    }
}
