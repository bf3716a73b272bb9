use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI, TAU};

use super::{
    angle_between, bearing_of_direction, direction_of_bearing, normalize_180, rotate,
    TurnDirection, GEO_CIRCLE_TOLERANCE,
};

/// A directed circle on the unit sphere.
///
/// `center` is a unit vector and `radius` an angle in [0, pi]. Radius pi/2 is
/// a great circle. The circle is traversed counter-clockwise about `center`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCircle {
    pub center: DVec3,
    pub radius: f64,
}

/// Up to two intersection points of a pair of circles.
#[derive(Debug, Clone, Copy, Default)]
pub struct Intersections {
    points: [DVec3; 2],
    count: usize,
}

impl Intersections {
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn as_slice(&self) -> &[DVec3] {
        &self.points[..self.count]
    }
}

impl GeoCircle {
    pub fn new(center: DVec3, radius: f64) -> Self {
        Self {
            center: center.normalize(),
            radius: radius.clamp(0.0, PI),
        }
    }

    /// Great circle through two points, directed from `a` to `b`.
    /// Returns `None` for identical or antipodal points.
    pub fn great_circle_between(a: DVec3, b: DVec3) -> Option<Self> {
        let normal = a.cross(b);
        if normal.length() < GEO_CIRCLE_TOLERANCE {
            return None;
        }
        Some(Self::new(normal, FRAC_PI_2))
    }

    /// Great circle through `p` heading along `course` (true degrees).
    pub fn from_point_course(p: DVec3, course: f64) -> Self {
        Self::tangent_at(p, course, FRAC_PI_2)
    }

    /// Circle of angular radius `radius` passing through `p` with direction
    /// `course` at `p`. Radius below pi/2 yields a left-turning circle.
    pub fn tangent_at(p: DVec3, course: f64, radius: f64) -> Self {
        let left = direction_of_bearing(p, course - 90.0);
        let (sin, cos) = radius.sin_cos();
        Self::new(p * cos + left * sin, radius)
    }

    /// Turn circle of angular radius `radius` (< pi/2) through `p`, tangent
    /// to `course`, turning in `direction`.
    pub fn turn_circle(p: DVec3, course: f64, radius: f64, direction: TurnDirection) -> Self {
        let directed = match direction {
            TurnDirection::Left => radius,
            TurnDirection::Right => PI - radius,
        };
        Self::tangent_at(p, course, directed)
    }

    pub fn is_great_circle(&self) -> bool {
        (self.radius - FRAC_PI_2).abs() < GEO_CIRCLE_TOLERANCE
    }

    /// Turn direction of this circle; `None` for great circles.
    pub fn turn_direction(&self) -> Option<TurnDirection> {
        if self.is_great_circle() {
            None
        } else if self.radius < FRAC_PI_2 {
            Some(TurnDirection::Left)
        } else {
            Some(TurnDirection::Right)
        }
    }

    /// Undirected angular radius in [0, pi/2].
    pub fn turn_radius(&self) -> f64 {
        self.radius.min(PI - self.radius)
    }

    pub fn reversed(&self) -> Self {
        Self {
            center: -self.center,
            radius: PI - self.radius,
        }
    }

    /// Angular distance from the circle's center to `p`.
    pub fn distance_to_center(&self, p: DVec3) -> f64 {
        angle_between(self.center, p)
    }

    /// Signed angular distance from the circle to `p`; negative inside.
    pub fn distance(&self, p: DVec3) -> f64 {
        self.distance_to_center(p) - self.radius
    }

    pub fn includes(&self, p: DVec3, tolerance: f64) -> bool {
        self.distance(p).abs() <= tolerance
    }

    /// Whether `p` lies strictly inside the circle (on the center's side).
    pub fn encircles(&self, p: DVec3, tolerance: f64) -> bool {
        self.distance(p) < -tolerance
    }

    /// Closest point on the circle to `p`. `None` when `p` is a pole of the circle.
    pub fn closest(&self, p: DVec3) -> Option<DVec3> {
        let projected = p - self.center * p.dot(self.center);
        if projected.length_squared() < 1e-24 {
            return None;
        }
        let (sin, cos) = self.radius.sin_cos();
        Some((self.center * cos + projected.normalize() * sin).normalize())
    }

    /// Projects `p` onto the circle, leaving poles untouched.
    pub fn project(&self, p: DVec3) -> DVec3 {
        self.closest(p).unwrap_or(p)
    }

    /// Unit direction of travel at `p`.
    pub fn direction_at(&self, p: DVec3) -> DVec3 {
        self.center.cross(p).normalize_or_zero()
    }

    /// True bearing (degrees) of the circle's direction of travel at `p`.
    pub fn bearing_at(&self, p: DVec3) -> f64 {
        bearing_of_direction(p, self.direction_at(p))
    }

    /// Rotation angle in [0, 2pi) about the center needed to travel from
    /// `from` to `to` along the circle. Angles within `tolerance` of a full
    /// revolution collapse to zero.
    pub fn angle_along(&self, from: DVec3, to: DVec3, tolerance: f64) -> f64 {
        let a = from - self.center * from.dot(self.center);
        let b = to - self.center * to.dot(self.center);
        let mut angle = self.center.dot(a.cross(b)).atan2(a.dot(b));
        if angle < 0.0 {
            angle += TAU;
        }
        if angle > TAU - tolerance {
            0.0
        } else {
            angle
        }
    }

    /// Distance in radians travelled along the circle from `from` to `to`.
    pub fn distance_along(&self, from: DVec3, to: DVec3, tolerance: f64) -> f64 {
        let sin = self.radius.sin();
        let angle_tolerance = if sin > 1e-12 { tolerance / sin } else { tolerance };
        self.angle_along(from, to, angle_tolerance) * sin
    }

    /// Arc length (radians) of a full revolution.
    pub fn circumference(&self) -> f64 {
        TAU * self.radius.sin()
    }

    /// Point reached after travelling `distance` radians along the circle from
    /// the projection of `from`.
    pub fn offset_distance_along(&self, from: DVec3, distance: f64) -> DVec3 {
        let sin = self.radius.sin();
        if sin < 1e-12 {
            return self.center;
        }
        self.offset_angle_along(from, distance / sin)
    }

    pub fn offset_angle_along(&self, from: DVec3, angle: f64) -> DVec3 {
        rotate(self.project(from), self.center, angle).normalize()
    }

    /// Point on the circle, reached from `from` in the direction of travel,
    /// at which the circle's bearing equals `bearing` (true degrees). Intended
    /// for turn circles; `turn_angle_deg` is the magnitude of the heading
    /// change to cover.
    pub fn point_at_bearing(&self, from: DVec3, bearing: f64, turn_angle_deg: f64) -> DVec3 {
        let sign = if self.radius < FRAC_PI_2 { -1.0 } else { 1.0 };
        let start = self.project(from);
        let mut angle = turn_angle_deg.abs().to_radians();
        let mut point = rotate(start, self.center, angle).normalize();
        for _ in 0..6 {
            let error = normalize_180(bearing - self.bearing_at(point));
            if error.abs() < 1e-10 {
                break;
            }
            angle += sign * error.to_radians();
            point = rotate(start, self.center, angle).normalize();
        }
        point
    }

    /// Intersection points with another circle.
    pub fn intersections(&self, other: &GeoCircle) -> Intersections {
        let mut out = Intersections::default();
        let c1 = self.center;
        let c2 = other.center;
        let d = c1.dot(c2);
        let denom = 1.0 - d * d;
        if denom < 1e-14 {
            return out;
        }

        let (cos1, cos2) = (self.radius.cos(), other.radius.cos());
        let a = (cos1 - d * cos2) / denom;
        let b = (cos2 - d * cos1) / denom;
        let base = c1 * a + c2 * b;
        let w = base.length_squared();
        if w > 1.0 + 1e-12 {
            return out;
        }

        let axis = c1.cross(c2);
        let t_sq = (1.0 - w).max(0.0) / axis.length_squared();
        if t_sq < 1e-20 {
            out.points[0] = base.normalize();
            out.count = 1;
            return out;
        }

        let t = t_sq.sqrt();
        out.points[0] = (base + axis * t).normalize();
        out.points[1] = (base - axis * t).normalize();
        out.count = 2;
        out
    }

    /// Tangent point between this circle and a circle assumed tangent to it.
    pub fn tangent_point(&self, other: &GeoCircle) -> Option<DVec3> {
        let toward = other.center - self.center * other.center.dot(self.center);
        if toward.length_squared() < 1e-24 {
            return None;
        }
        let toward = toward.normalize();
        let (sin, cos) = self.radius.sin_cos();
        let plus = (self.center * cos + toward * sin).normalize();
        let minus = (self.center * cos - toward * sin).normalize();
        let err_plus = (other.distance_to_center(plus) - other.radius).abs();
        let err_minus = (other.distance_to_center(minus) - other.radius).abs();
        Some(if err_plus <= err_minus { plus } else { minus })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{meters_to_rad, GeoPoint};

    #[test]
    fn test_great_circle_needs_distinct_points() {
        let a = GeoPoint::new(10.0, 20.0).to_cartesian();
        let near_antipode = rotate(-a, DVec3::Z, 1e-9);
        assert!(GeoCircle::great_circle_between(a, near_antipode).is_none());
        assert!(GeoCircle::great_circle_between(a, a).is_none());
        let b = GeoPoint::new(10.0, 20.01).to_cartesian();
        assert!(GeoCircle::great_circle_between(a, b).is_some());
    }

    #[test]
    fn test_equator_flows_east() {
        let p = GeoPoint::new(0.0, 0.0).to_cartesian();
        let circle = GeoCircle::from_point_course(p, 90.0);
        assert!((circle.center - DVec3::Z).length() < 1e-12);
        assert!((circle.bearing_at(p) - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_turn_circle_direction_encoding() {
        let p = GeoPoint::new(10.0, 20.0).to_cartesian();
        let r = meters_to_rad(1000.0);
        let left = GeoCircle::turn_circle(p, 45.0, r, TurnDirection::Left);
        let right = GeoCircle::turn_circle(p, 45.0, r, TurnDirection::Right);
        assert_eq!(left.turn_direction(), Some(TurnDirection::Left));
        assert_eq!(right.turn_direction(), Some(TurnDirection::Right));
        assert!(left.includes(p, 1e-9));
        assert!(right.includes(p, 1e-9));
        assert!((left.bearing_at(p) - 45.0).abs() < 1e-6);
        assert!((right.bearing_at(p) - 45.0).abs() < 1e-6);
    }

    #[test]
    fn test_great_circle_intersections_are_antipodal() {
        let equator = GeoCircle::new(DVec3::Z, FRAC_PI_2);
        let meridian = GeoCircle::new(DVec3::Y, FRAC_PI_2);
        let hits = equator.intersections(&meridian);
        assert_eq!(hits.len(), 2);
        let [a, b] = [hits.as_slice()[0], hits.as_slice()[1]];
        assert!((a + b).length() < 1e-9);
        assert!(a.z.abs() < 1e-9 && a.y.abs() < 1e-9);
    }

    #[test]
    fn test_disjoint_circles_have_no_intersections() {
        let a = GeoCircle::new(DVec3::Z, 0.1);
        let b = GeoCircle::new(-DVec3::Z, 0.1);
        assert!(a.intersections(&b).is_empty());
    }

    #[test]
    fn test_angle_along_quarter_turn() {
        let equator = GeoCircle::new(DVec3::Z, FRAC_PI_2);
        let angle = equator.angle_along(DVec3::X, DVec3::Y, 1e-9);
        assert!((angle - FRAC_PI_2).abs() < 1e-12);
        let back = equator.angle_along(DVec3::Y, DVec3::X, 1e-9);
        assert!((back - 3.0 * FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_point_at_bearing_on_turn_circle() {
        let p = GeoPoint::new(45.0, 5.0).to_cartesian();
        let circle = GeoCircle::turn_circle(p, 90.0, meters_to_rad(2000.0), TurnDirection::Right);
        let end = circle.point_at_bearing(p, 180.0, 90.0);
        assert!(circle.includes(end, 1e-9));
        assert!((circle.bearing_at(end) - 180.0).abs() < 1e-6);
    }

    #[test]
    fn test_reversed_circle_keeps_points() {
        let circle = GeoCircle::new(DVec3::new(0.3, 0.2, 0.9), 0.4);
        let p = circle.offset_angle_along(circle.closest(DVec3::X).unwrap(), 0.0);
        assert!(circle.reversed().includes(p, 1e-9));
    }
}
