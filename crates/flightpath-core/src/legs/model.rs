//! Leg records and their calculated geometry.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;

use crate::geo::{GeoPoint, TurnDirection};
use crate::path::FlightPathVector;

/// Path terminator of a leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LegType {
    /// Initial fix.
    If,
    /// Track to fix.
    Tf,
    /// Direct to fix.
    Df,
    /// Course to fix.
    Cf,
    /// Course to altitude.
    Ca,
    /// Fix to altitude.
    Fa,
    /// Track from fix for a distance.
    Fc,
    /// Track from fix to a DME distance.
    Fd,
    /// From fix, manual termination.
    Fm,
    /// Course to DME distance.
    Cd,
    /// Course to radial.
    Cr,
    /// Course to intercept the next leg.
    Ci,
    /// Heading to altitude.
    Va,
    /// Heading to DME distance.
    Vd,
    /// Heading to intercept the next leg.
    Vi,
    /// Heading, manual termination.
    Vm,
    /// Heading to radial.
    Vr,
    /// Hold to altitude.
    Ha,
    /// Hold to fix (single circuit).
    Hf,
    /// Hold, manual termination.
    Hm,
    /// Procedure turn.
    Pi,
    /// DME arc to fix.
    Af,
    /// Constant radius arc to fix.
    Rf,
    Discontinuity,
    ThruDiscontinuity,
}

impl LegType {
    pub fn is_discontinuity(self) -> bool {
        matches!(self, LegType::Discontinuity | LegType::ThruDiscontinuity)
    }

    pub fn is_hold(self) -> bool {
        matches!(self, LegType::Ha | LegType::Hf | LegType::Hm)
    }

    /// Legs flown on a heading rather than a track.
    pub fn is_heading(self) -> bool {
        matches!(self, LegType::Va | LegType::Vd | LegType::Vi | LegType::Vm | LegType::Vr)
    }

    /// Legs whose path starts wherever the aircraft is when they become active.
    pub fn starts_from_aircraft(self) -> bool {
        matches!(
            self,
            LegType::Df
                | LegType::Ca
                | LegType::Cd
                | LegType::Cr
                | LegType::Ci
                | LegType::Va
                | LegType::Vd
                | LegType::Vi
                | LegType::Vm
                | LegType::Vr
        )
    }

    /// Legs whose termination is not a fix.
    pub fn has_floating_end(self) -> bool {
        matches!(
            self,
            LegType::Ca
                | LegType::Fa
                | LegType::Fc
                | LegType::Fd
                | LegType::Fm
                | LegType::Cd
                | LegType::Cr
                | LegType::Ci
                | LegType::Va
                | LegType::Vd
                | LegType::Vi
                | LegType::Vm
                | LegType::Vr
        )
    }
}

impl fmt::Display for LegType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            LegType::If => "IF",
            LegType::Tf => "TF",
            LegType::Df => "DF",
            LegType::Cf => "CF",
            LegType::Ca => "CA",
            LegType::Fa => "FA",
            LegType::Fc => "FC",
            LegType::Fd => "FD",
            LegType::Fm => "FM",
            LegType::Cd => "CD",
            LegType::Cr => "CR",
            LegType::Ci => "CI",
            LegType::Va => "VA",
            LegType::Vd => "VD",
            LegType::Vi => "VI",
            LegType::Vm => "VM",
            LegType::Vr => "VR",
            LegType::Ha => "HA",
            LegType::Hf => "HF",
            LegType::Hm => "HM",
            LegType::Pi => "PI",
            LegType::Af => "AF",
            LegType::Rf => "RF",
            LegType::Discontinuity => "DISCO",
            LegType::ThruDiscontinuity => "THRU DISCO",
        };
        f.write_str(code)
    }
}

/// Fix role flags carried by raw leg records.
pub mod fix_type {
    pub const IAF: u32 = 1 << 0;
    pub const IF: u32 = 1 << 1;
    pub const FAF: u32 = 1 << 2;
    pub const MAP: u32 = 1 << 3;
    pub const MAHP: u32 = 1 << 4;
}

/// Raw leg record as supplied by the navigation database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightPlanLeg {
    pub leg_type: LegType,
    #[serde(default)]
    pub fix_ident: Option<String>,
    /// Recommended navaid.
    #[serde(default)]
    pub origin_ident: Option<String>,
    #[serde(default)]
    pub arc_center_ident: Option<String>,
    /// Course or heading, degrees.
    #[serde(default)]
    pub course: f64,
    #[serde(default)]
    pub true_degrees: bool,
    /// Nautical miles, or minutes when `distance_minutes` is set.
    #[serde(default)]
    pub distance: f64,
    #[serde(default)]
    pub distance_minutes: bool,
    /// Radial from the recommended navaid, degrees magnetic.
    #[serde(default)]
    pub theta: f64,
    /// Distance from the recommended navaid, nautical miles.
    #[serde(default)]
    pub rho: f64,
    /// Meters.
    #[serde(default)]
    pub altitude1: f64,
    #[serde(default)]
    pub altitude2: f64,
    #[serde(default)]
    pub turn_direction: Option<TurnDirection>,
    #[serde(default)]
    pub fix_type_flags: u32,
}

impl FlightPlanLeg {
    pub fn new(leg_type: LegType) -> Self {
        Self {
            leg_type,
            fix_ident: None,
            origin_ident: None,
            arc_center_ident: None,
            course: 0.0,
            true_degrees: false,
            distance: 0.0,
            distance_minutes: false,
            theta: 0.0,
            rho: 0.0,
            altitude1: 0.0,
            altitude2: 0.0,
            turn_direction: None,
            fix_type_flags: 0,
        }
    }

    pub fn discontinuity() -> Self {
        Self::new(LegType::Discontinuity)
    }

    pub fn fix(mut self, ident: impl Into<String>) -> Self {
        self.fix_ident = Some(ident.into());
        self
    }

    pub fn origin(mut self, ident: impl Into<String>) -> Self {
        self.origin_ident = Some(ident.into());
        self
    }

    pub fn arc_center(mut self, ident: impl Into<String>) -> Self {
        self.arc_center_ident = Some(ident.into());
        self
    }

    pub fn course(mut self, course: f64, true_degrees: bool) -> Self {
        self.course = course;
        self.true_degrees = true_degrees;
        self
    }

    pub fn distance(mut self, distance: f64) -> Self {
        self.distance = distance;
        self
    }

    pub fn minutes(mut self, minutes: f64) -> Self {
        self.distance = minutes;
        self.distance_minutes = true;
        self
    }

    pub fn theta_rho(mut self, theta: f64, rho: f64) -> Self {
        self.theta = theta;
        self.rho = rho;
        self
    }

    pub fn altitude(mut self, altitude: f64) -> Self {
        self.altitude1 = altitude;
        self
    }

    pub fn turn(mut self, direction: TurnDirection) -> Self {
        self.turn_direction = Some(direction);
        self
    }
}

/// Flags describing how a leg entered the plan.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LegDefinitionFlags(u32);

impl LegDefinitionFlags {
    pub const NONE: Self = Self(0);
    pub const DIRECT_TO_TARGET: Self = Self(1 << 0);
    pub const MISSED_APPROACH: Self = Self(1 << 1);
    pub const OBS: Self = Self(1 << 2);
    pub const VECTORS_TO_FINAL: Self = Self(1 << 3);

    pub fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl BitOr for LegDefinitionFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for LegDefinitionFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LegDefinitionFlags({:#x})", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerticalPhase {
    #[default]
    Climb,
    Descent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AltitudeRestriction {
    #[default]
    Unknown,
    At,
    AtOrAbove,
    AtOrBelow,
    Between,
}

/// Vertical constraint data attached to a leg.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VerticalData {
    pub phase: VerticalPhase,
    pub altitude_desc: AltitudeRestriction,
    /// Meters.
    pub altitude1: f64,
    pub altitude2: f64,
    /// Knots; zero when unconstrained.
    pub speed: f64,
    /// Flight path angle, degrees.
    pub fpa: Option<f64>,
}

/// Geometry computed for one leg.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LegCalculation {
    /// The leg's own path, independent of transitions.
    pub flight_path: Vec<FlightPathVector>,
    /// Turn vectors entering the leg.
    pub ingress: Vec<FlightPathVector>,
    /// Index into `flight_path` where the ingress rejoins it.
    pub ingress_join_index: usize,
    /// Turn vectors leaving the leg.
    pub egress: Vec<FlightPathVector>,
    /// Index into `flight_path` where the egress leaves it.
    pub egress_join_index: usize,
    /// The path actually flown: ingress, flight path interior, egress.
    pub ingress_to_egress: Vec<FlightPathVector>,
    pub start: Option<GeoPoint>,
    pub end: Option<GeoPoint>,
    /// Initial desired track, true degrees.
    pub initial_dtk: Option<f64>,
    /// Magnetic variation applied to the leg's course, degrees east.
    pub course_mag_var: f64,
    /// Meters.
    pub distance: f64,
    pub cumulative_distance: f64,
    pub distance_with_transitions: f64,
    pub cumulative_distance_with_transitions: f64,
    /// Geometry was produced through a fallback construction.
    pub degraded: bool,
}

impl LegCalculation {
    /// Drop transitions; called before the leg's path is rebuilt.
    pub fn clear_transitions(&mut self) {
        self.ingress.clear();
        self.egress.clear();
        self.ingress_join_index = 0;
        self.egress_join_index = 0;
    }

    pub fn has_geometry(&self) -> bool {
        !self.flight_path.is_empty()
    }
}

/// A leg in a flight plan: the raw record plus calculated and vertical data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegDefinition {
    #[serde(default)]
    pub name: Option<String>,
    pub leg: FlightPlanLeg,
    #[serde(default)]
    pub flags: LegDefinitionFlags,
    /// True course into the fix chosen for a direct-to or an OBS leg.
    #[serde(default)]
    pub selected_course: Option<f64>,
    #[serde(default)]
    pub calculated: Option<LegCalculation>,
    #[serde(default)]
    pub vertical: VerticalData,
}

impl LegDefinition {
    pub fn new(leg: FlightPlanLeg) -> Self {
        Self {
            name: leg.fix_ident.clone(),
            leg,
            flags: LegDefinitionFlags::NONE,
            selected_course: None,
            calculated: None,
            vertical: VerticalData::default(),
        }
    }

    pub fn with_flags(mut self, flags: LegDefinitionFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn leg_type(&self) -> LegType {
        self.leg.leg_type
    }
}

impl From<FlightPlanLeg> for LegDefinition {
    fn from(leg: FlightPlanLeg) -> Self {
        LegDefinition::new(leg)
    }
}
