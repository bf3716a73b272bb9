//! Tangent-circle construction between two directed circles.

use glam::DVec3;
use std::f64::consts::{FRAC_PI_2, PI};

use crate::geo::{angle_between, meters_to_rad, GeoCircle, TurnDirection, GEO_CIRCLE_TOLERANCE};
use crate::path::{put_vector, FlightPathVector, VectorFlags};

/// Tangency check tolerance, looser than [`GEO_CIRCLE_TOLERANCE`] because the
/// solution accumulates several trigonometric round trips.
const TANGENT_TOLERANCE: f64 = 1e-6;

/// A circle tangent to a source and a target circle, all three sharing the
/// same direction of travel at the tangent points.
#[derive(Debug, Clone, Copy)]
pub struct TangentCircle {
    pub circle: GeoCircle,
    /// Tangent point on the source circle.
    pub from_point: DVec3,
    /// Tangent point on the target circle.
    pub to_point: DVec3,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TangentSolutions {
    items: [Option<TangentCircle>; 2],
}

impl TangentSolutions {
    pub fn iter(&self) -> impl Iterator<Item = &TangentCircle> {
        self.items.iter().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.items.iter().all(Option::is_none)
    }

    /// Solution whose tangent points lie closest to `reference`.
    pub fn closest_to(&self, reference: DVec3) -> Option<TangentCircle> {
        self.iter()
            .min_by(|a, b| {
                let da = angle_between(a.from_point, reference) + angle_between(a.to_point, reference);
                let db = angle_between(b.from_point, reference) + angle_between(b.to_point, reference);
                da.total_cmp(&db)
            })
            .copied()
    }
}

/// Directed angular radius for a turn of `radius` in `direction`.
pub fn directed_radius(radius: f64, direction: TurnDirection) -> f64 {
    match direction {
        TurnDirection::Left => radius,
        TurnDirection::Right => PI - radius,
    }
}

/// Every circle of directed angular radius `radius` tangent to both `from` and
/// `to`. A directed circle tangent to another with the same direction has
/// its center at `|r1 - r2|` from the other's center.
pub fn tangent_circles(from: &GeoCircle, to: &GeoCircle, radius: f64) -> TangentSolutions {
    let mut solutions = TangentSolutions::default();

    let from_locus = GeoCircle::new(from.center, (from.radius - radius).abs());
    let to_locus = GeoCircle::new(to.center, (to.radius - radius).abs());
    let centers = from_locus.intersections(&to_locus);

    let mut slot = 0;
    for &center in centers.as_slice() {
        let circle = GeoCircle::new(center, radius);
        let (Some(from_point), Some(to_point)) = (from.tangent_point(&circle), to.tangent_point(&circle)) else {
            continue;
        };
        if !circle.includes(from_point, TANGENT_TOLERANCE) || !circle.includes(to_point, TANGENT_TOLERANCE) {
            continue;
        }
        solutions.items[slot] = Some(TangentCircle { circle, from_point, to_point });
        slot += 1;
    }
    solutions
}

/// Connecting circle: `None` joins with a great circle.
#[derive(Debug, Clone, Copy)]
pub struct Connector {
    pub radius_m: f64,
    pub direction: TurnDirection,
}

/// Connect `from` to `to` through a tangent circle.
///
/// Emits an optional lead-in along `from` (from `lead_in_start` to the
/// tangent point), the connecting arc, and an optional lead-out along `to`
/// (from the tangent point to `lead_out_end`). Among several solutions the
/// one closest to `reference` wins. No solution yields zero vectors.
pub fn build_connect_circles(
    vectors: &mut Vec<FlightPathVector>,
    index: usize,
    from: &GeoCircle,
    to: &GeoCircle,
    connector: Option<Connector>,
    reference: DVec3,
    lead_in_start: Option<DVec3>,
    lead_out_end: Option<DVec3>,
    flags: VectorFlags,
) -> usize {
    let radius = match connector {
        Some(c) => directed_radius(meters_to_rad(c.radius_m), c.direction),
        None => FRAC_PI_2,
    };

    let Some(solution) = tangent_circles(from, to, radius).closest_to(reference) else {
        tracing::debug!("connect circles: no tangent circle solution");
        return 0;
    };

    let mut count = 0;
    if let Some(start) = lead_in_start {
        if from.distance_along(start, solution.from_point, GEO_CIRCLE_TOLERANCE) > GEO_CIRCLE_TOLERANCE {
            put_vector(vectors, index + count, FlightPathVector::from_circle(from, start, solution.from_point, flags));
            count += 1;
        }
    }

    put_vector(
        vectors,
        index + count,
        FlightPathVector::from_circle(&solution.circle, solution.from_point, solution.to_point, flags),
    );
    count += 1;

    if let Some(end) = lead_out_end {
        if to.distance_along(solution.to_point, end, GEO_CIRCLE_TOLERANCE) > GEO_CIRCLE_TOLERANCE {
            put_vector(vectors, index + count, FlightPathVector::from_circle(to, solution.to_point, end, flags));
            count += 1;
        }
    }
    count
}
