//! Great-circle vectors.

use crate::error::GeometryError;
use crate::geo::{angle_between, meters_to_rad, GeoCircle, GeoPoint, GEO_CIRCLE_TOLERANCE};
use crate::path::{put_vector, FlightPathVector, VectorFlags};

/// Shortest great-circle path from `start` to `end`.
///
/// Antipodal endpoints need `initial_course`, otherwise the path is
/// ambiguous and [`GeometryError::AmbiguousPath`] is returned. Coincident
/// endpoints produce no vector.
pub fn build(
    vectors: &mut Vec<FlightPathVector>,
    index: usize,
    start: &GeoPoint,
    end: &GeoPoint,
    initial_course: Option<f64>,
    flags: VectorFlags,
) -> Result<usize, GeometryError> {
    let a = start.to_cartesian();
    let b = end.to_cartesian();
    if angle_between(a, b) <= GEO_CIRCLE_TOLERANCE {
        return Ok(0);
    }

    let circle = match GeoCircle::great_circle_between(a, b) {
        Some(circle) => circle,
        None => match initial_course {
            Some(course) => GeoCircle::from_point_course(a, course),
            None => return Err(GeometryError::AmbiguousPath),
        },
    };

    put_vector(vectors, index, FlightPathVector::from_circle(&circle, a, b, flags));
    Ok(1)
}

/// Great-circle path from `start` along `course` for `distance_m` meters.
pub fn build_from_course(
    vectors: &mut Vec<FlightPathVector>,
    index: usize,
    start: &GeoPoint,
    course: f64,
    distance_m: f64,
    flags: VectorFlags,
) -> usize {
    if distance_m <= 0.01 {
        return 0;
    }
    let p = start.to_cartesian();
    let circle = GeoCircle::from_point_course(p, course);
    let end = circle.offset_distance_along(p, meters_to_rad(distance_m));
    put_vector(vectors, index, FlightPathVector::from_circle(&circle, p, end, flags));
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::utils::vector_initial_course;

    #[test]
    fn test_simple_path() {
        let a = GeoPoint::new(33.0, -117.0);
        let b = GeoPoint::new(34.0, -118.0);
        let mut vectors = Vec::new();
        assert_eq!(build(&mut vectors, 0, &a, &b, None, VectorFlags::NONE), Ok(1));
        assert!((vectors[0].distance - a.distance_m(&b)).abs() < 0.01);
        assert!((vector_initial_course(&vectors[0]) - a.bearing_to(&b)).abs() < 1e-6);
    }

    #[test]
    fn test_antipodal_requires_course() {
        let a = GeoPoint::new(10.0, 20.0);
        let b = a.antipode();
        let mut vectors = Vec::new();
        assert_eq!(
            build(&mut vectors, 0, &a, &b, None, VectorFlags::NONE),
            Err(GeometryError::AmbiguousPath)
        );
        assert!(vectors.is_empty());
    }

    #[test]
    fn test_antipodal_with_course() {
        let a = GeoPoint::new(10.0, 20.0);
        let b = a.antipode();
        let mut vectors = Vec::new();
        assert_eq!(build(&mut vectors, 0, &a, &b, Some(37.0), VectorFlags::NONE), Ok(1));
        assert!((vector_initial_course(&vectors[0]) - 37.0).abs() < 1e-6);
        let half = std::f64::consts::PI * crate::geo::EARTH_RADIUS_M;
        assert!((vectors[0].distance - half).abs() < 1.0);
    }

    #[test]
    fn test_identical_points_build_nothing() {
        let a = GeoPoint::new(1.0, 1.0);
        let mut vectors = Vec::new();
        assert_eq!(build(&mut vectors, 0, &a, &a, None, VectorFlags::NONE), Ok(0));
    }

    #[test]
    fn test_from_course_overwrites_slot() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(0.0, 1.0);
        let mut vectors = Vec::new();
        build(&mut vectors, 0, &a, &b, None, VectorFlags::NONE).unwrap();
        let count = build_from_course(&mut vectors, 0, &a, 0.0, 10_000.0, VectorFlags::NONE);
        assert_eq!(count, 1);
        assert_eq!(vectors.len(), 1);
        assert!((vectors[0].distance - 10_000.0).abs() < 1e-6);
        assert!(vectors[0].end.lat > 0.0);
    }
}
