pub mod builders;
pub mod calculator;
pub mod config;
pub mod error;
pub mod facility;
pub mod geo;
pub mod legs;
pub mod path;
pub mod plan;
pub mod service;
pub mod state;
pub mod turns;

pub use calculator::FlightPathCalculator;
pub use config::{FlightPathCalculatorOptions, SpeedMode};
pub use error::{Error, FlightPlanError, GeometryError, Result};
pub use facility::{
    ConstantMagVar, Facility, FacilityCache, FacilityKind, FacilityStore, MagVarSource, NoMagVar,
};
pub use geo::{GeoCircle, GeoPoint, TurnDirection};
pub use legs::{
    FlightPlanLeg, LegCalculation, LegDefinition, LegDefinitionFlags, LegType, VerticalData,
};
pub use path::{FlightPathVector, VectorFlags, VectorType};
pub use plan::{
    ActiveLegKind, DirectToData, FlightPlan, FlightPlanSegment, PlanEvent, PlanNotification,
    ProcedureDetails, SegmentType,
};
pub use service::{CalculationOutcome, PlanCalculationService};
pub use state::AircraftState;
pub use turns::{TurnCalculator, TurnKind};
