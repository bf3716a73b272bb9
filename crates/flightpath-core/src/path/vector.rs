//! Flight path vectors: the atomic flyable segments produced by the engine.

use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use crate::geo::{GeoCircle, GeoPoint, EARTH_RADIUS_M, GEO_CIRCLE_TOLERANCE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorType {
    #[default]
    CircleArc,
}

/// Bit set describing the role of a vector within a leg.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VectorFlags(u32);

impl VectorFlags {
    pub const NONE: VectorFlags = VectorFlags(0);
    /// Constant-radius turn from one course to another.
    pub const TURN_TO_COURSE: VectorFlags = VectorFlags(1 << 0);
    /// Part of a published arc (RF/AF).
    pub const ARC: VectorFlags = VectorFlags(1 << 1);
    pub const HOLD_ENTRY: VectorFlags = VectorFlags(1 << 2);
    pub const HOLD_LEG: VectorFlags = VectorFlags(1 << 3);
    pub const COURSE_REVERSAL: VectorFlags = VectorFlags(1 << 4);
    /// Turn joining two legs.
    pub const LEG_TO_LEG_TURN: VectorFlags = VectorFlags(1 << 5);
    /// Turn begun before the junction so that it ends on the next leg.
    pub const ANTICIPATED_TURN: VectorFlags = VectorFlags(1 << 6);
    pub const DIRECT: VectorFlags = VectorFlags(1 << 7);
    pub const INTERCEPT: VectorFlags = VectorFlags(1 << 8);
    pub const CONSTANT_HEADING: VectorFlags = VectorFlags(1 << 9);
    pub const PROCEDURE_TURN: VectorFlags = VectorFlags(1 << 10);
    /// Built through a fallback; differs from nominal procedure design.
    pub const DEGRADED: VectorFlags = VectorFlags(1 << 11);

    const NAMES: [(VectorFlags, &'static str); 12] = [
        (Self::TURN_TO_COURSE, "TURN_TO_COURSE"),
        (Self::ARC, "ARC"),
        (Self::HOLD_ENTRY, "HOLD_ENTRY"),
        (Self::HOLD_LEG, "HOLD_LEG"),
        (Self::COURSE_REVERSAL, "COURSE_REVERSAL"),
        (Self::LEG_TO_LEG_TURN, "LEG_TO_LEG_TURN"),
        (Self::ANTICIPATED_TURN, "ANTICIPATED_TURN"),
        (Self::DIRECT, "DIRECT"),
        (Self::INTERCEPT, "INTERCEPT"),
        (Self::CONSTANT_HEADING, "CONSTANT_HEADING"),
        (Self::PROCEDURE_TURN, "PROCEDURE_TURN"),
        (Self::DEGRADED, "DEGRADED"),
    ];

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn contains(&self, other: VectorFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(&self, other: VectorFlags) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: VectorFlags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: VectorFlags) {
        self.0 &= !other.0;
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl BitOr for VectorFlags {
    type Output = VectorFlags;

    fn bitor(self, rhs: VectorFlags) -> VectorFlags {
        VectorFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for VectorFlags {
    fn bitor_assign(&mut self, rhs: VectorFlags) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for VectorFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "NONE");
        }
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "{}", names.join(" | "))
    }
}

/// A single flyable arc along a [`GeoCircle`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightPathVector {
    pub vector_type: VectorType,
    pub flags: VectorFlags,
    /// Angular radius of the defining circle.
    pub radius: f64,
    /// Unit vector of the defining circle's center.
    pub center: DVec3,
    pub start: GeoPoint,
    pub end: GeoPoint,
    /// Length in meters.
    pub distance: f64,
    /// Heading to fly instead of tracking the path, for heading legs.
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub is_heading_true: bool,
}

impl FlightPathVector {
    /// Build a vector from a circle and two points; the points are projected
    /// onto the circle and the distance is measured along its direction.
    pub fn from_circle(circle: &GeoCircle, start: DVec3, end: DVec3, flags: VectorFlags) -> Self {
        let start = circle.project(start);
        let end = circle.project(end);
        let distance = circle.distance_along(start, end, GEO_CIRCLE_TOLERANCE) * EARTH_RADIUS_M;
        Self {
            vector_type: VectorType::CircleArc,
            flags,
            radius: circle.radius,
            center: circle.center,
            start: GeoPoint::from_cartesian(start),
            end: GeoPoint::from_cartesian(end),
            distance,
            heading: None,
            is_heading_true: false,
        }
    }

    pub fn circle(&self) -> GeoCircle {
        GeoCircle {
            center: self.center,
            radius: self.radius,
        }
    }

    pub fn is_great_circle(&self) -> bool {
        self.circle().is_great_circle()
    }

    pub fn start_cartesian(&self) -> DVec3 {
        self.start.to_cartesian()
    }

    pub fn end_cartesian(&self) -> DVec3 {
        self.end.to_cartesian()
    }

    pub fn with_heading(mut self, heading: f64, is_true: bool) -> Self {
        self.heading = Some(heading);
        self.is_heading_true = is_true;
        self.flags |= VectorFlags::CONSTANT_HEADING;
        self
    }
}

/// Last of the `count` vectors written from `index`, if any were written.
pub(crate) fn last_written(vectors: &[FlightPathVector], index: usize, count: usize) -> Option<&FlightPathVector> {
    count.checked_sub(1).and_then(|n| vectors.get(index + n))
}

/// Write `vector` into `vectors[index]`, growing the buffer when needed.
pub(crate) fn put_vector(vectors: &mut Vec<FlightPathVector>, index: usize, vector: FlightPathVector) {
    if index < vectors.len() {
        vectors[index] = vector;
    } else {
        vectors.push(vector);
    }
}
