//! End-to-end flight path calculation over flight plans.

use std::sync::Arc;

use flightpath_core::path::utils::{
    distance_along_vector, is_point_along_vector, turn_anticipation_distance, vector_turn_radius_m,
};
use flightpath_core::{
    AircraftState, Facility, FacilityKind, FacilityStore, FlightPathCalculator, FlightPathCalculatorOptions,
    FlightPlan, FlightPlanLeg, GeoPoint, LegCalculation, LegType, NoMagVar, PlanEvent, SegmentType, VectorFlags,
};

fn calculator(facilities: Vec<Facility>, options: FlightPathCalculatorOptions) -> FlightPathCalculator {
    let store: FacilityStore = facilities.into_iter().collect();
    FlightPathCalculator::new(Arc::new(store), Arc::new(NoMagVar), options)
}

fn waypoint(ident: &str, point: GeoPoint) -> Facility {
    Facility::new(ident, FacilityKind::Waypoint, point)
}

/// Aircraft state asking for a fixed turn radius.
fn state_with_radius(radius_m: f64) -> AircraftState {
    AircraftState {
        position: GeoPoint::new(0.0, 0.0),
        track: 90.0,
        altitude: 3000.0,
        ground_speed: 250.0,
        true_airspeed: 250.0,
        climb_rate: 0.0,
        desired_turn_radius: Some(radius_m),
    }
}

fn plan_with(legs: Vec<FlightPlanLeg>) -> FlightPlan {
    let mut plan = FlightPlan::new(0);
    let segment = plan.add_segment(SegmentType::Enroute);
    for leg in legs {
        plan.add_leg(segment, leg.into(), None).unwrap();
    }
    plan
}

fn calculated(plan: &FlightPlan) -> Vec<LegCalculation> {
    plan.legs().map(|leg| leg.calculated.clone().unwrap()).collect()
}

fn tf(ident: &str) -> FlightPlanLeg {
    FlightPlanLeg::new(LegType::Tf).fix(ident)
}

#[test]
fn test_right_angle_turn_shortens_both_legs() {
    let a = GeoPoint::new(0.0, 0.0);
    let b = GeoPoint::new(0.0, 0.3);
    let c = GeoPoint::new(-0.3, 0.3);
    let calc = calculator(
        vec![waypoint("A", a), waypoint("B", b), waypoint("C", c)],
        FlightPathCalculatorOptions::default(),
    );
    let mut plan = plan_with(vec![FlightPlanLeg::new(LegType::If).fix("A"), tf("B"), tf("C")]);
    plan.calculate(&calc, 0, Some(&state_with_radius(1000.0)));
    let legs = calculated(&plan);

    let (first, second) = (&legs[1], &legs[2]);
    assert_eq!(first.egress.len(), 1);
    assert_eq!(second.ingress.len(), 1);
    let turn_start = &first.egress[0];
    let turn_end = &second.ingress[0];
    assert!((vector_turn_radius_m(turn_start) - 1000.0).abs() < 0.1);
    assert!((vector_turn_radius_m(turn_end) - 1000.0).abs() < 0.1);
    assert!(!turn_start.flags.contains(VectorFlags::DEGRADED));

    assert!(is_point_along_vector(&first.flight_path[0], &turn_start.start, 0.5));
    assert!(is_point_along_vector(&second.flight_path[0], &turn_end.end, 0.5));

    let anticipation = turn_anticipation_distance(1000.0, 90.0);
    let straight_a = &first.ingress_to_egress[0];
    let straight_b = second.ingress_to_egress.last().unwrap();
    assert!((first.distance - straight_a.distance - anticipation).abs() < 0.5);
    assert!((second.distance - straight_b.distance - anticipation).abs() < 0.5);
}

#[test]
fn test_discontinuity_blocks_turns() {
    let calc = calculator(
        vec![
            waypoint("A", GeoPoint::new(0.0, 0.0)),
            waypoint("B", GeoPoint::new(0.0, 0.3)),
            waypoint("C", GeoPoint::new(-0.3, 0.3)),
            waypoint("D", GeoPoint::new(-0.3, 0.6)),
        ],
        FlightPathCalculatorOptions::default(),
    );
    let mut plan = plan_with(vec![
        FlightPlanLeg::new(LegType::If).fix("A"),
        tf("B"),
        FlightPlanLeg::discontinuity(),
        tf("C"),
        tf("D"),
    ]);
    plan.calculate(&calc, 0, None);
    let legs = calculated(&plan);

    assert!(legs[2].flight_path.is_empty());
    assert!(legs[2].ingress_to_egress.is_empty());
    assert!(legs[1].egress.is_empty());
    assert!(legs[3].ingress.is_empty());
    // the leg after the gap only marks its fix
    assert!(legs[3].flight_path.is_empty());
    assert!(!legs[4].flight_path.is_empty());
}

#[test]
fn test_cumulative_distance_never_decreases() {
    let points = [
        ("P1", GeoPoint::new(45.0, 7.0)),
        ("P2", GeoPoint::new(45.2, 7.1)),
        ("P3", GeoPoint::new(45.25, 7.4)),
        ("P4", GeoPoint::new(45.05, 7.6)),
        ("P5", GeoPoint::new(45.1, 7.9)),
    ];
    let calc = calculator(
        points.iter().map(|(ident, p)| waypoint(ident, *p)).collect(),
        FlightPathCalculatorOptions::default(),
    );
    let mut legs = vec![FlightPlanLeg::new(LegType::If).fix("P1")];
    legs.extend(points[1..].iter().map(|(ident, _)| tf(ident)));
    legs.push(FlightPlanLeg::new(LegType::Cf).fix("P3").course(270.0, true));
    let mut plan = plan_with(legs);
    plan.calculate(&calc, 0, None);

    let legs = calculated(&plan);
    for pair in legs.windows(2) {
        assert!(pair[1].cumulative_distance >= pair[0].cumulative_distance);
        assert!(pair[1].cumulative_distance_with_transitions >= pair[0].cumulative_distance_with_transitions);
    }
    let total: f64 = legs.iter().map(|l| l.distance).sum();
    assert!((legs.last().unwrap().cumulative_distance - total).abs() < 1e-6);
}

#[test]
fn test_adjacent_turns_do_not_overlap() {
    let b = GeoPoint::new(0.0, 0.3);
    let c = b.offset_m(180.0, 1500.0);
    let d = c.offset_m(90.0, 20_000.0);
    let calc = calculator(
        vec![waypoint("A", GeoPoint::new(0.0, 0.0)), waypoint("B", b), waypoint("C", c), waypoint("D", d)],
        FlightPathCalculatorOptions::default(),
    );
    let mut plan = plan_with(vec![FlightPlanLeg::new(LegType::If).fix("A"), tf("B"), tf("C"), tf("D")]);
    plan.calculate(&calc, 0, Some(&state_with_radius(1000.0)));
    let legs = calculated(&plan);

    let middle = &legs[2];
    let vector = &middle.flight_path[0];
    let claimed_in = distance_along_vector(vector, &middle.ingress[0].end);
    let released_out = distance_along_vector(vector, &middle.egress[0].start);
    assert!(claimed_in <= released_out + 0.05, "{claimed_in} > {released_out}");
    assert!(middle.egress[0].flags.contains(VectorFlags::DEGRADED));
    assert!(vector_turn_radius_m(&middle.egress[0]) < 1000.0);
}

#[test]
fn test_calculation_spans_segments_and_notifies() {
    let calc = calculator(
        vec![
            waypoint("A", GeoPoint::new(51.0, -1.0)),
            waypoint("B", GeoPoint::new(51.2, -0.8)),
            waypoint("C", GeoPoint::new(51.3, -0.4)),
        ],
        FlightPathCalculatorOptions::default(),
    );
    let mut plan = FlightPlan::new(4);
    let departure = plan.add_segment(SegmentType::Departure);
    let enroute = plan.add_segment(SegmentType::Enroute);
    plan.add_leg(departure, FlightPlanLeg::new(LegType::If).fix("A").into(), None).unwrap();
    plan.add_leg(departure, tf("B").into(), None).unwrap();
    plan.add_leg(enroute, tf("C").into(), None).unwrap();

    let mut rx = plan.subscribe();
    let generation = plan.calculate(&calc, 0, None);
    assert_eq!(generation, 1);

    let notification = rx.try_recv().unwrap();
    assert_eq!(notification.plan_index, 4);
    assert_eq!(notification.event, PlanEvent::Calculated { from_index: 0, generation: 1 });

    // the turn at B joins legs from different segments
    let b = plan.get_leg(1).unwrap().calculated.as_ref().unwrap();
    let c = plan.get_leg(2).unwrap().calculated.as_ref().unwrap();
    assert_eq!(b.egress.len(), 1);
    assert_eq!(c.ingress.len(), 1);
    assert_eq!(plan.get_segment(enroute).unwrap().legs.len(), 1);
}
