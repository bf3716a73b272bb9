//! Flight plan change notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Buffered notifications per subscriber before slow receivers lag.
pub(crate) const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActiveLegKind {
    Lateral,
    Vertical,
    Calculating,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlanEvent {
    SegmentInserted { segment_index: usize },
    SegmentRemoved { segment_index: usize },
    LegAdded { segment_index: usize, global_index: usize },
    LegRemoved { segment_index: usize, global_index: usize },
    ActiveLegChanged { kind: ActiveLegKind, index: usize },
    VerticalDataChanged { global_index: usize },
    ObsChanged { global_index: usize, course: Option<f64> },
    DirectToChanged,
    ProcedureDetailsChanged,
    UserDataChanged { key: String },
    /// Geometry was recalculated from `from_index` onward.
    Calculated { from_index: usize, generation: u64 },
}

/// A plan event stamped with its plan and time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanNotification {
    pub plan_index: usize,
    pub timestamp: DateTime<Utc>,
    pub event: PlanEvent,
}

impl PlanNotification {
    pub fn new(plan_index: usize, event: PlanEvent) -> Self {
        Self {
            plan_index,
            timestamp: Utc::now(),
            event,
        }
    }
}
