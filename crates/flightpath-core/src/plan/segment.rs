use serde::{Deserialize, Serialize};

use crate::legs::LegDefinition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentType {
    Origin,
    Departure,
    Enroute,
    Arrival,
    Approach,
    Destination,
    MissedApproach,
    RandomDirectTo,
}

/// A run of legs sharing one procedural role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightPlanSegment {
    pub segment_index: usize,
    pub segment_type: SegmentType,
    /// Global index of the segment's first leg.
    pub offset: usize,
    pub legs: Vec<LegDefinition>,
    #[serde(default)]
    pub airway: Option<String>,
}

impl FlightPlanSegment {
    pub fn new(segment_index: usize, segment_type: SegmentType) -> Self {
        Self {
            segment_index,
            segment_type,
            offset: 0,
            legs: Vec::new(),
            airway: None,
        }
    }

    pub fn with_airway(mut self, airway: impl Into<String>) -> Self {
        self.airway = Some(airway.into());
        self
    }

    /// Whether the global leg index falls inside this segment.
    pub fn contains(&self, global_index: usize) -> bool {
        global_index >= self.offset && global_index < self.offset + self.legs.len()
    }
}
