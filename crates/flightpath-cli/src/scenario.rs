//! Scenario input and summary output for the CLI.

use flightpath_core::geo::METERS_PER_NM;
use flightpath_core::{
    AircraftState, ConstantMagVar, Facility, FacilityKind, FacilityStore, FlightPathCalculatorOptions,
    FlightPathVector, FlightPlanLeg, GeoPoint, LegDefinition, LegType, SegmentType, TurnDirection,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Replaces the environment-derived options when present.
    #[serde(default)]
    pub options: Option<FlightPathCalculatorOptions>,
    pub facilities: Vec<Facility>,
    /// Ambient magnetic variation, degrees east.
    #[serde(default)]
    pub mag_var: f64,
    pub segments: Vec<ScenarioSegment>,
    #[serde(default)]
    pub active_leg: usize,
    #[serde(default)]
    pub aircraft: Option<AircraftState>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioSegment {
    pub segment_type: SegmentType,
    pub legs: Vec<FlightPlanLeg>,
}

impl Scenario {
    pub fn facility_store(&self) -> FacilityStore {
        self.facilities.iter().cloned().collect()
    }

    pub fn mag_var_source(&self) -> ConstantMagVar {
        ConstantMagVar(self.mag_var)
    }
}

#[derive(Debug, Serialize)]
pub struct PlanSummary {
    pub generation: u64,
    pub total_distance_nm: f64,
    pub legs: Vec<LegSummary>,
}

#[derive(Debug, Serialize)]
pub struct LegSummary {
    pub index: usize,
    pub ident: Option<String>,
    pub leg_type: LegType,
    pub start: Option<GeoPoint>,
    pub end: Option<GeoPoint>,
    pub initial_dtk: Option<f64>,
    pub distance_nm: f64,
    pub distance_with_transitions_nm: f64,
    pub cumulative_distance_nm: f64,
    pub degraded: bool,
    pub vector_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vectors: Option<Vec<FlightPathVector>>,
}

impl LegSummary {
    pub fn from_leg(index: usize, leg: &LegDefinition, with_vectors: bool) -> Self {
        let calc = leg.calculated.clone().unwrap_or_default();
        Self {
            index,
            ident: leg.name.clone(),
            leg_type: leg.leg_type(),
            start: calc.start,
            end: calc.end,
            initial_dtk: calc.initial_dtk,
            distance_nm: calc.distance / METERS_PER_NM,
            distance_with_transitions_nm: calc.distance_with_transitions / METERS_PER_NM,
            cumulative_distance_nm: calc.cumulative_distance_with_transitions / METERS_PER_NM,
            degraded: calc.degraded,
            vector_count: calc.ingress_to_egress.len(),
            vectors: with_vectors.then_some(calc.ingress_to_egress),
        }
    }
}

/// A small approach with a missed approach into a hold.
pub fn demo() -> Scenario {
    let fix = |ident: &str, lat: f64, lon: f64| Facility::new(ident, FacilityKind::Waypoint, GeoPoint::new(lat, lon));
    Scenario {
        options: None,
        facilities: vec![
            fix("ALPHA", 47.0, 8.0),
            fix("BRAVO", 47.2, 8.3),
            fix("CHRLY", 47.3, 8.6),
            fix("FINAL", 47.3, 8.9),
            fix("RWY27", 47.3, 9.05),
            fix("HOLDX", 47.45, 9.2),
        ],
        mag_var: 2.0,
        segments: vec![
            ScenarioSegment {
                segment_type: SegmentType::Enroute,
                legs: vec![
                    FlightPlanLeg::new(LegType::If).fix("ALPHA"),
                    FlightPlanLeg::new(LegType::Tf).fix("BRAVO"),
                ],
            },
            ScenarioSegment {
                segment_type: SegmentType::Approach,
                legs: vec![
                    FlightPlanLeg::new(LegType::Tf).fix("CHRLY"),
                    FlightPlanLeg::new(LegType::Cf).fix("FINAL").course(90.0, true),
                    FlightPlanLeg::new(LegType::Tf).fix("RWY27"),
                ],
            },
            ScenarioSegment {
                segment_type: SegmentType::MissedApproach,
                legs: vec![
                    FlightPlanLeg::new(LegType::Ca).course(90.0, true).altitude(1500.0),
                    FlightPlanLeg::new(LegType::Df).fix("HOLDX"),
                    FlightPlanLeg::new(LegType::Hm)
                        .fix("HOLDX")
                        .course(270.0, true)
                        .minutes(1.0)
                        .turn(TurnDirection::Right),
                ],
            },
        ],
        active_leg: 1,
        aircraft: None,
    }
}
