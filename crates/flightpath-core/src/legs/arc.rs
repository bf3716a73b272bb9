//! Arc legs: RF (constant radius to fix) and AF (DME arc to fix).

use tracing::warn;

use super::context::{finish, previous_end, LegContext};
use super::model::{LegCalculation, LegDefinition};
use crate::builders::circle::{arc_circle, build_arc};
use crate::facility::course_mag_var;
use crate::geo::{nm_to_meters, normalize_180, GeoPoint, TurnDirection, GEO_CIRCLE_TOLERANCE};
use crate::path::VectorFlags;

/// Direction that makes the arc from `start` to `end` shortest, or the one
/// matching `course` at the start when a course is known.
fn infer_direction(center: &GeoPoint, radius_m: f64, start: &GeoPoint, end: &GeoPoint, course: Option<f64>) -> TurnDirection {
    let candidates = [TurnDirection::Left, TurnDirection::Right];
    let score = |direction: TurnDirection| -> f64 {
        let Ok(circle) = arc_circle(direction, radius_m, center) else {
            return f64::INFINITY;
        };
        let s = circle.project(start.to_cartesian());
        match course {
            Some(course) => normalize_180(circle.bearing_at(s) - course).abs(),
            None => circle.angle_along(s, end.to_cartesian(), GEO_CIRCLE_TOLERANCE),
        }
    };
    candidates
        .into_iter()
        .min_by(|a, b| score(*a).total_cmp(&score(*b)))
        .unwrap_or(TurnDirection::Right)
}

fn write_arc(
    calc: &mut LegCalculation,
    direction: TurnDirection,
    radius_m: f64,
    center: &GeoPoint,
    start: &GeoPoint,
    end: &GeoPoint,
) -> usize {
    match build_arc(&mut calc.flight_path, 0, direction, radius_m, center, start, end, VectorFlags::ARC) {
        Ok(count) => count,
        Err(err) => {
            warn!(%err, "arc leg not built");
            0
        }
    }
}

/// RF: arc about the arc center fix from the previous end to the fix.
pub fn calculate_radius_to_fix(ctx: &LegContext<'_>, legs: &[LegDefinition], index: usize, calc: &mut LegCalculation) {
    let leg = &legs[index].leg;
    let (Some(center), Some(fix)) = (ctx.facility(leg.arc_center_ident.as_deref(), leg.leg_type), ctx.fix(leg)) else {
        finish(calc, 0, None);
        return;
    };
    calc.course_mag_var = course_mag_var(Some(&fix), &fix.location, ctx.mag_var);
    let Some(start) = previous_end(legs, index) else {
        finish(calc, 0, Some(fix.location));
        return;
    };

    let radius_m = center.location.distance_m(&fix.location);
    let direction = leg.turn_direction.unwrap_or_else(|| {
        infer_direction(&center.location, radius_m, &start.point, &fix.location, start.course)
    });
    let count = if start.point.equals(&fix.location, GEO_CIRCLE_TOLERANCE) {
        0
    } else {
        write_arc(calc, direction, radius_m, &center.location, &start.point, &fix.location)
    };
    finish(calc, count, Some(fix.location));
}

/// AF: DME arc about the recommended navaid at `rho`, from the boundary
/// radial `theta` (or the previous leg's end) to the fix.
pub fn calculate_dme_arc(ctx: &LegContext<'_>, legs: &[LegDefinition], index: usize, calc: &mut LegCalculation) {
    let leg = &legs[index].leg;
    let (Some(navaid), Some(fix)) = (ctx.navaid(leg), ctx.fix(leg)) else {
        finish(calc, 0, None);
        return;
    };
    let mag_var = course_mag_var(Some(&navaid), &navaid.location, ctx.mag_var);
    calc.course_mag_var = mag_var;

    let radius_m = nm_to_meters(leg.rho);
    let previous = previous_end(legs, index);
    let start = previous
        .map(|prev| prev.point)
        .unwrap_or_else(|| navaid.location.offset_m(leg.theta + mag_var, radius_m));
    let direction = leg.turn_direction.unwrap_or_else(|| {
        infer_direction(&navaid.location, radius_m, &start, &fix.location, previous.and_then(|p| p.course))
    });
    let count = write_arc(calc, direction, radius_m, &navaid.location, &start, &fix.location);
    finish(calc, count, Some(fix.location));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FlightPathCalculatorOptions;
    use crate::facility::{Facility, FacilityKind, FacilityStore, NoMagVar};
    use crate::legs::model::{FlightPlanLeg, LegType};
    use crate::path::utils::vector_turn_radius_m;

    #[test]
    fn test_dme_arc_from_boundary_radial() {
        let vor = GeoPoint::new(40.0, -100.0);
        let fix = vor.offset_m(90.0, nm_to_meters(12.0));
        let facilities: FacilityStore = [
            Facility::new("VOR", FacilityKind::Vor, vor),
            Facility::new("ARC", FacilityKind::Waypoint, fix),
        ]
        .into_iter()
        .collect();
        let options = FlightPathCalculatorOptions::default();
        let ctx = LegContext { facilities: &facilities, mag_var: &NoMagVar, options: &options, state: None };

        let legs = vec![LegDefinition::new(
            FlightPlanLeg::new(LegType::Af)
                .fix("ARC")
                .origin("VOR")
                .theta_rho(0.0, 12.0)
                .turn(TurnDirection::Right),
        )];
        let mut calc = LegCalculation::default();
        calculate_dme_arc(&ctx, &legs, 0, &mut calc);
        assert_eq!(calc.flight_path.len(), 1);
        let arc = &calc.flight_path[0];
        assert!(arc.flags.contains(VectorFlags::ARC));
        assert!((vector_turn_radius_m(arc) - nm_to_meters(12.0)).abs() < 1.0);
        // a quarter of the 12 nm arc, clockwise from north to east
        let quarter = std::f64::consts::FRAC_PI_2 * nm_to_meters(12.0);
        assert!((arc.distance - quarter).abs() / quarter < 0.01);
        assert!(arc.end.distance_m(&fix) < 1.0);
    }

    #[test]
    fn test_radius_to_fix_infers_direction_from_course() {
        let center = GeoPoint::new(0.0, 0.0);
        let radius = 5_000.0;
        let start = center.offset_m(180.0, radius);
        let fix = center.offset_m(90.0, radius);
        let facilities: FacilityStore = [
            Facility::new("CTR", FacilityKind::Waypoint, center),
            Facility::new("FIX", FacilityKind::Waypoint, fix),
        ]
        .into_iter()
        .collect();
        let options = FlightPathCalculatorOptions::default();
        let ctx = LegContext { facilities: &facilities, mag_var: &NoMagVar, options: &options, state: None };

        // arriving at the southern point heading east: a left turn about the center
        let mut prev = LegDefinition::new(FlightPlanLeg::new(LegType::Tf).fix("S"));
        let before = start.offset_m(270.0, 2_000.0);
        let line = crate::geo::GeoCircle::great_circle_between(before.to_cartesian(), start.to_cartesian()).unwrap();
        prev.calculated = Some(LegCalculation {
            flight_path: vec![crate::path::FlightPathVector::from_circle(
                &line,
                before.to_cartesian(),
                start.to_cartesian(),
                VectorFlags::NONE,
            )],
            end: Some(start),
            ..Default::default()
        });
        let legs = vec![prev, LegDefinition::new(FlightPlanLeg::new(LegType::Rf).fix("FIX").arc_center("CTR"))];
        let mut calc = LegCalculation::default();
        calculate_radius_to_fix(&ctx, &legs, 1, &mut calc);
        assert_eq!(calc.flight_path.len(), 1);
        let arc = &calc.flight_path[0];
        assert_eq!(arc.circle().turn_direction(), Some(TurnDirection::Left));
        let quarter = std::f64::consts::FRAC_PI_2 * radius;
        assert!((arc.distance - quarter).abs() < 5.0);
    }
}
