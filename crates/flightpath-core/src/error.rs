//! Error types for the flight path engine.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// The shortest path between two antipodal points is undefined.
    #[error("ambiguous great circle path between antipodal points; an initial course is required")]
    AmbiguousPath,

    #[error("invalid turn radius {0} m")]
    InvalidRadius(f64),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlightPlanError {
    /// Lookup of an index that does not currently resolve to an element.
    #[error("{kind} not found at index {index}")]
    NotFound { kind: &'static str, index: usize },

    /// Structural operation outside the plan's current bounds.
    #[error("index {index} out of range (length {len})")]
    OutOfRange { index: usize, len: usize },

    #[error("flight plan {0} is busy calculating")]
    Busy(usize),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("geometry error: {0}")]
    Geometry(#[from] GeometryError),

    #[error("flight plan error: {0}")]
    FlightPlan(#[from] FlightPlanError),
}

pub(crate) fn not_found(kind: &'static str, index: usize) -> FlightPlanError {
    FlightPlanError::NotFound { kind, index }
}
