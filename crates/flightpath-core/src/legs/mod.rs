//! Leg model and per-leg-type path calculators.
//!
//! A calculator only fills a leg's own `flight_path` (plus its start, end,
//! initial DTK and magnetic variation). Transitions between legs belong to
//! the turn calculator.

mod arc;
mod context;
mod course;
mod hold;
mod intercept;
mod model;
mod procedure;
mod selected;
mod track;

pub use context::{LegContext, LegStart};
pub use hold::{hold_entry, HoldEntry};
pub use model::{
    fix_type, AltitudeRestriction, FlightPlanLeg, LegCalculation, LegDefinition, LegDefinitionFlags, LegType,
    VerticalData, VerticalPhase,
};

use tracing::debug;

/// Calculate the path of `legs[index]` into `calc`, reusing its buffers.
///
/// `calc` must not be the one stored in `legs[index]`; callers take it out
/// of the leg for the duration of the call.
pub fn calculate_leg(
    ctx: &LegContext<'_>,
    legs: &[LegDefinition],
    index: usize,
    active_leg_index: usize,
    calc: &mut LegCalculation,
) {
    calc.flight_path.clear();
    calc.start = None;
    calc.end = None;
    calc.initial_dtk = None;
    calc.course_mag_var = 0.0;
    calc.degraded = false;

    let leg_type = legs[index].leg_type();
    if selected::calculate_selected(ctx, legs, index, active_leg_index, calc) {
        debug!(index, leg = %leg_type, vectors = calc.flight_path.len(), degraded = calc.degraded, "selected path calculated");
        return;
    }
    match leg_type {
        LegType::If | LegType::Tf => track::calculate_track_to_fix(ctx, legs, index, calc),
        LegType::Df => track::calculate_direct_to_fix(ctx, legs, index, active_leg_index, calc),
        LegType::Cf => track::calculate_course_to_fix(ctx, legs, index, calc),
        LegType::Ca | LegType::Va => course::calculate_course_to_altitude(ctx, legs, index, active_leg_index, calc),
        LegType::Fa => course::calculate_fix_to_altitude(ctx, legs, index, calc),
        LegType::Fc => course::calculate_fix_to_distance(ctx, legs, index, calc),
        LegType::Fm => course::calculate_fix_to_manual(ctx, legs, index, calc),
        LegType::Vm => course::calculate_heading_to_manual(ctx, legs, index, active_leg_index, calc),
        LegType::Fd | LegType::Cd | LegType::Vd => intercept::calculate_to_dme(ctx, legs, index, active_leg_index, calc),
        LegType::Cr | LegType::Vr => intercept::calculate_to_radial(ctx, legs, index, active_leg_index, calc),
        LegType::Ci | LegType::Vi => intercept::calculate_to_intercept(ctx, legs, index, active_leg_index, calc),
        LegType::Ha | LegType::Hf | LegType::Hm => hold::calculate_hold(ctx, legs, index, calc),
        LegType::Pi => procedure::calculate_procedure_turn(ctx, legs, index, calc),
        LegType::Af => arc::calculate_dme_arc(ctx, legs, index, calc),
        LegType::Rf => arc::calculate_radius_to_fix(ctx, legs, index, calc),
        LegType::Discontinuity | LegType::ThruDiscontinuity => context::finish(calc, 0, None),
    }

    debug!(
        index,
        leg = %leg_type,
        vectors = calc.flight_path.len(),
        degraded = calc.degraded,
        "leg calculated"
    );
}
