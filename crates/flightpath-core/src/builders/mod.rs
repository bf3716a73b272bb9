//! Vector builders.
//!
//! Each builder writes vectors into a caller-owned buffer starting at a given
//! index (overwriting existing entries, pushing past the end) and returns how
//! many it wrote. Builders keep no state between calls.

pub mod circle;
pub mod connect;
pub mod direct;
pub mod great_circle;
pub mod intercept;
pub mod procedure_turn;
pub mod turn;

pub use connect::{build_connect_circles, tangent_circles, Connector, TangentCircle, TangentSolutions};
pub use direct::build_direct_to_point;
pub use intercept::{build_circle_intercept, intercept_point};
pub use procedure_turn::ProcedureTurnParams;
pub use turn::{build_turn_to_course, build_turn_to_join_at_point, build_turn_to_join_great_circle};
