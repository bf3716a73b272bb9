//! Flight path vectors and the helpers that query them.

pub mod utils;
mod vector;

pub use vector::{FlightPathVector, VectorFlags, VectorType};
pub(crate) use vector::{last_written, put_vector};
