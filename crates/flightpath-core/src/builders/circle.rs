//! Single circular-arc vectors.

use glam::DVec3;
use std::f64::consts::PI;

use crate::error::GeometryError;
use crate::geo::{meters_to_rad, GeoCircle, GeoPoint, TurnDirection};
use crate::path::{put_vector, FlightPathVector, VectorFlags};

/// Write one arc along `circle` from `start` to `end`. Both points are
/// projected onto the circle.
pub fn build(
    vectors: &mut Vec<FlightPathVector>,
    index: usize,
    circle: &GeoCircle,
    start: DVec3,
    end: DVec3,
    flags: VectorFlags,
) -> usize {
    put_vector(vectors, index, FlightPathVector::from_circle(circle, start, end, flags));
    1
}

/// Write one arc of `radius_m` meters about `center`, flown in `direction`.
pub fn build_arc(
    vectors: &mut Vec<FlightPathVector>,
    index: usize,
    direction: TurnDirection,
    radius_m: f64,
    center: &GeoPoint,
    start: &GeoPoint,
    end: &GeoPoint,
    flags: VectorFlags,
) -> Result<usize, GeometryError> {
    let circle = arc_circle(direction, radius_m, center)?;
    Ok(build(vectors, index, &circle, start.to_cartesian(), end.to_cartesian(), flags))
}

/// Directed circle of `radius_m` meters about `center`.
pub fn arc_circle(direction: TurnDirection, radius_m: f64, center: &GeoPoint) -> Result<GeoCircle, GeometryError> {
    let radius = meters_to_rad(radius_m);
    if !(radius > 0.0 && radius < PI / 2.0) {
        return Err(GeometryError::InvalidRadius(radius_m));
    }
    let c = center.to_cartesian();
    Ok(match direction {
        TurnDirection::Left => GeoCircle::new(c, radius),
        TurnDirection::Right => GeoCircle::new(-c, PI - radius),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_half_arc_distance() {
        let center = GeoPoint::new(40.0, -100.0);
        let radius_m = 5000.0;
        let start = center.offset_m(0.0, radius_m);
        let end = center.offset_m(180.0, radius_m);
        let mut vectors = Vec::new();
        let count = build_arc(&mut vectors, 0, TurnDirection::Right, radius_m, &center, &start, &end, VectorFlags::ARC).unwrap();
        assert_eq!(count, 1);
        let expected = PI * (radius_m / crate::geo::EARTH_RADIUS_M).sin() * crate::geo::EARTH_RADIUS_M;
        assert!((vectors[0].distance - expected).abs() < 0.01);
        // flying clockwise from north of the center starts eastbound
        assert!((crate::path::utils::vector_initial_course(&vectors[0]) - 90.0).abs() < 1e-4);
    }

    #[test]
    fn test_invalid_radius() {
        let p = GeoPoint::new(0.0, 0.0);
        let mut vectors = Vec::new();
        let result = build_arc(&mut vectors, 0, TurnDirection::Left, 0.0, &p, &p, &p, VectorFlags::ARC);
        assert_eq!(result, Err(GeometryError::InvalidRadius(0.0)));
    }
}
