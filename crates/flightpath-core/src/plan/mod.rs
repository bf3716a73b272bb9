//! Flight plan model: sparse segments of legs, active leg cursors and
//! procedure metadata.
//!
//! Legs are addressed by a global index across all segments. Every
//! structural change reflows segment offsets so that a segment's `offset` is
//! the global index of its first leg, and `length` is the total leg count.

mod events;
mod segment;

pub use events::{ActiveLegKind, PlanEvent, PlanNotification};
pub use segment::{FlightPlanSegment, SegmentType};

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use crate::calculator::FlightPathCalculator;
use crate::error::{not_found, FlightPlanError};
use crate::legs::{LegDefinition, LegDefinitionFlags, VerticalData};
use crate::state::AircraftState;
use events::EVENT_CHANNEL_CAPACITY;

type PlanResult<T> = std::result::Result<T, FlightPlanError>;

/// Selected procedures, by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcedureDetails {
    pub origin_runway: Option<String>,
    pub departure: Option<String>,
    pub departure_runway_transition: Option<String>,
    pub departure_enroute_transition: Option<String>,
    pub arrival: Option<String>,
    pub arrival_enroute_transition: Option<String>,
    pub arrival_runway_transition: Option<String>,
    pub approach: Option<String>,
    pub approach_transition: Option<String>,
    pub destination_runway: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectToData {
    /// Global index of the leg flown direct to.
    pub target_leg_index: usize,
    /// Course to fly into the target, true degrees. `None` flies direct.
    #[serde(default)]
    pub intercept_course: Option<f64>,
}

#[derive(Debug)]
pub struct FlightPlan {
    plan_index: usize,
    segments: Vec<Option<FlightPlanSegment>>,
    active_lateral_leg: usize,
    active_vertical_leg: usize,
    active_calculating_leg: usize,
    procedure_details: ProcedureDetails,
    direct_to_data: Option<DirectToData>,
    user_data: HashMap<String, Value>,
    length: usize,
    generation: u64,
    events: broadcast::Sender<PlanNotification>,
}

impl FlightPlan {
    pub fn new(plan_index: usize) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            plan_index,
            segments: Vec::new(),
            active_lateral_leg: 0,
            active_vertical_leg: 0,
            active_calculating_leg: 0,
            procedure_details: ProcedureDetails::default(),
            direct_to_data: None,
            user_data: HashMap::new(),
            length: 0,
            generation: 0,
            events,
        }
    }

    pub fn plan_index(&self) -> usize {
        self.plan_index
    }

    /// Total number of legs.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Number of segment slots, tombstones included.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Number of completed calculations.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlanNotification> {
        self.events.subscribe()
    }

    pub(crate) fn event_sender(&self) -> broadcast::Sender<PlanNotification> {
        self.events.clone()
    }

    // ---- Segments ----

    /// Append an empty segment, returning its index.
    pub fn add_segment(&mut self, segment_type: SegmentType) -> usize {
        let segment_index = self.segments.len();
        self.segments.push(Some(FlightPlanSegment::new(segment_index, segment_type)));
        self.reflow();
        self.emit(PlanEvent::SegmentInserted { segment_index });
        segment_index
    }

    /// Place an empty segment at `segment_index`. A tombstoned slot is reused;
    /// otherwise later segments shift up by one.
    pub fn insert_segment(&mut self, segment_index: usize, segment_type: SegmentType) -> PlanResult<usize> {
        if segment_index > self.segments.len() {
            return Err(FlightPlanError::OutOfRange {
                index: segment_index,
                len: self.segments.len(),
            });
        }
        let segment = FlightPlanSegment::new(segment_index, segment_type);
        match self.segments.get_mut(segment_index) {
            Some(slot @ None) => *slot = Some(segment),
            _ => self.segments.insert(segment_index, Some(segment)),
        }
        self.reflow();
        self.emit(PlanEvent::SegmentInserted { segment_index });
        Ok(segment_index)
    }

    /// Remove a segment, leaving a tombstone so later segment indices stay put.
    pub fn remove_segment(&mut self, segment_index: usize) -> PlanResult<FlightPlanSegment> {
        let removed = self
            .segments
            .get_mut(segment_index)
            .and_then(Option::take)
            .ok_or_else(|| not_found("segment", segment_index))?;
        while matches!(self.segments.last(), Some(None)) {
            self.segments.pop();
        }
        self.reflow();
        self.emit(PlanEvent::SegmentRemoved { segment_index });
        Ok(removed)
    }

    pub fn get_segment(&self, segment_index: usize) -> PlanResult<&FlightPlanSegment> {
        self.segments
            .get(segment_index)
            .and_then(Option::as_ref)
            .ok_or_else(|| not_found("segment", segment_index))
    }

    /// Mutable access for metadata edits. Leg lists are edited through
    /// [`FlightPlan::add_leg`] and [`FlightPlan::remove_leg`] so offsets stay valid.
    pub fn set_segment_airway(&mut self, segment_index: usize, airway: Option<String>) -> PlanResult<()> {
        let segment = self.segment_mut(segment_index)?;
        segment.airway = airway;
        Ok(())
    }

    /// Live segments in order.
    pub fn segments(&self) -> impl Iterator<Item = &FlightPlanSegment> {
        self.segments.iter().flatten()
    }

    fn segment_mut(&mut self, segment_index: usize) -> PlanResult<&mut FlightPlanSegment> {
        self.segments
            .get_mut(segment_index)
            .and_then(Option::as_mut)
            .ok_or_else(|| not_found("segment", segment_index))
    }

    // ---- Legs ----

    /// Insert `leg` into a segment at `position` (appended when `None`),
    /// returning its global index.
    pub fn add_leg(&mut self, segment_index: usize, leg: LegDefinition, position: Option<usize>) -> PlanResult<usize> {
        let segment = self.segment_mut(segment_index)?;
        let position = position.unwrap_or(segment.legs.len());
        if position > segment.legs.len() {
            return Err(FlightPlanError::OutOfRange {
                index: position,
                len: segment.legs.len(),
            });
        }
        segment.legs.insert(position, leg);
        let global_index = segment.offset + position;
        self.reflow();
        self.emit(PlanEvent::LegAdded {
            segment_index,
            global_index,
        });
        Ok(global_index)
    }

    pub fn remove_leg(&mut self, segment_index: usize, position: usize) -> PlanResult<LegDefinition> {
        let segment = self.segment_mut(segment_index)?;
        if position >= segment.legs.len() {
            return Err(not_found("leg", position));
        }
        let removed = segment.legs.remove(position);
        let global_index = segment.offset + position;
        self.reflow();
        self.emit(PlanEvent::LegRemoved {
            segment_index,
            global_index,
        });
        Ok(removed)
    }

    /// Index of the segment holding the leg at `global_index`.
    pub fn segment_index_of_leg(&self, global_index: usize) -> PlanResult<usize> {
        self.segments()
            .find(|segment| segment.contains(global_index))
            .map(|segment| segment.segment_index)
            .ok_or_else(|| not_found("leg", global_index))
    }

    pub fn get_leg(&self, global_index: usize) -> PlanResult<&LegDefinition> {
        let segment = self.get_segment(self.segment_index_of_leg(global_index)?)?;
        Ok(&segment.legs[global_index - segment.offset])
    }

    pub fn get_leg_mut(&mut self, global_index: usize) -> PlanResult<&mut LegDefinition> {
        let segment = self.segment_mut(self.segment_index_of_leg(global_index)?)?;
        let offset = segment.offset;
        Ok(&mut segment.legs[global_index - offset])
    }

    /// All legs in global order.
    pub fn legs(&self) -> impl Iterator<Item = &LegDefinition> {
        self.segments().flat_map(|segment| segment.legs.iter())
    }

    pub fn set_leg_vertical_data(&mut self, global_index: usize, vertical: VerticalData) -> PlanResult<()> {
        self.get_leg_mut(global_index)?.vertical = vertical;
        self.emit(PlanEvent::VerticalDataChanged { global_index });
        Ok(())
    }

    // ---- Active legs ----

    pub fn active_lateral_leg_index(&self) -> usize {
        self.active_lateral_leg
    }

    pub fn active_vertical_leg_index(&self) -> usize {
        self.active_vertical_leg
    }

    pub fn active_calculating_leg_index(&self) -> usize {
        self.active_calculating_leg
    }

    /// Returns the index actually set after clamping to the plan.
    pub fn set_lateral_leg_index(&mut self, index: usize) -> usize {
        self.active_lateral_leg = self.clamp_leg_index(index);
        self.emit(PlanEvent::ActiveLegChanged {
            kind: ActiveLegKind::Lateral,
            index: self.active_lateral_leg,
        });
        self.active_lateral_leg
    }

    pub fn set_vertical_leg_index(&mut self, index: usize) -> usize {
        self.active_vertical_leg = self.clamp_leg_index(index);
        self.emit(PlanEvent::ActiveLegChanged {
            kind: ActiveLegKind::Vertical,
            index: self.active_vertical_leg,
        });
        self.active_vertical_leg
    }

    /// The leg the calculator treats as being flown.
    pub fn set_calculating_leg_index(&mut self, index: usize) -> usize {
        self.active_calculating_leg = self.clamp_leg_index(index);
        self.emit(PlanEvent::ActiveLegChanged {
            kind: ActiveLegKind::Calculating,
            index: self.active_calculating_leg,
        });
        self.active_calculating_leg
    }

    fn clamp_leg_index(&self, index: usize) -> usize {
        index.min(self.length.saturating_sub(1))
    }

    // ---- Plan data ----

    pub fn direct_to_data(&self) -> Option<&DirectToData> {
        self.direct_to_data.as_ref()
    }

    /// Mark the direct-to target leg, clearing any previous target. The
    /// target is flown from the aircraft once it is the calculating leg.
    pub fn set_direct_to_data(&mut self, data: Option<DirectToData>) -> PlanResult<()> {
        if let Some(data) = &data {
            if data.target_leg_index >= self.length {
                return Err(not_found("leg", data.target_leg_index));
            }
        }
        for leg in self.segments.iter_mut().flatten().flat_map(|segment| segment.legs.iter_mut()) {
            if leg.flags.contains(LegDefinitionFlags::DIRECT_TO_TARGET) {
                leg.flags.remove(LegDefinitionFlags::DIRECT_TO_TARGET);
                if !leg.flags.contains(LegDefinitionFlags::OBS) {
                    leg.selected_course = None;
                }
            }
        }
        if let Some(data) = &data {
            let leg = self.get_leg_mut(data.target_leg_index)?;
            leg.flags.insert(LegDefinitionFlags::DIRECT_TO_TARGET);
            if data.intercept_course.is_some() || !leg.flags.contains(LegDefinitionFlags::OBS) {
                leg.selected_course = data.intercept_course;
            }
        }
        self.direct_to_data = data;
        self.emit(PlanEvent::DirectToChanged);
        Ok(())
    }

    /// Fly the leg at `global_index` along `course` through its fix, or
    /// return it to its published path with `None`.
    pub fn set_obs_course(&mut self, global_index: usize, course: Option<f64>) -> PlanResult<()> {
        let leg = self.get_leg_mut(global_index)?;
        match course {
            Some(course) => {
                leg.flags.insert(LegDefinitionFlags::OBS);
                leg.selected_course = Some(course);
            }
            None => {
                leg.flags.remove(LegDefinitionFlags::OBS);
                leg.selected_course = None;
            }
        }
        self.emit(PlanEvent::ObsChanged { global_index, course });
        Ok(())
    }

    pub fn procedure_details(&self) -> &ProcedureDetails {
        &self.procedure_details
    }

    pub fn set_procedure_details(&mut self, details: ProcedureDetails) {
        self.procedure_details = details;
        self.emit(PlanEvent::ProcedureDetailsChanged);
    }

    pub fn update_procedure_details(&mut self, update: impl FnOnce(&mut ProcedureDetails)) {
        update(&mut self.procedure_details);
        self.emit(PlanEvent::ProcedureDetailsChanged);
    }

    pub fn user_data(&self, key: &str) -> Option<&Value> {
        self.user_data.get(key)
    }

    pub fn set_user_data(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        self.user_data.insert(key.clone(), value);
        self.emit(PlanEvent::UserDataChanged { key });
    }

    pub fn delete_user_data(&mut self, key: &str) -> Option<Value> {
        let removed = self.user_data.remove(key);
        if removed.is_some() {
            self.emit(PlanEvent::UserDataChanged { key: key.to_string() });
        }
        removed
    }

    /// Deep copy under a new plan index, with its own subscribers.
    pub fn copy(&self, new_index: usize) -> FlightPlan {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        FlightPlan {
            plan_index: new_index,
            segments: self.segments.clone(),
            active_lateral_leg: self.active_lateral_leg,
            active_vertical_leg: self.active_vertical_leg,
            active_calculating_leg: self.active_calculating_leg,
            procedure_details: self.procedure_details.clone(),
            direct_to_data: self.direct_to_data.clone(),
            user_data: self.user_data.clone(),
            length: self.length,
            generation: self.generation,
            events,
        }
    }

    // ---- Calculation ----

    /// Recalculate geometry from `from_index` onward and notify subscribers.
    /// Returns the plan's new calculation generation.
    pub fn calculate(
        &mut self,
        calculator: &FlightPathCalculator,
        from_index: usize,
        state: Option<&AircraftState>,
    ) -> u64 {
        let from_index = from_index.min(self.length);

        let counts: Vec<usize> = self.segments().map(|segment| segment.legs.len()).collect();
        let mut legs: Vec<LegDefinition> = Vec::with_capacity(self.length);
        for segment in self.segments.iter_mut().flatten() {
            legs.append(&mut segment.legs);
        }

        calculator.calculate(&mut legs, from_index, self.active_calculating_leg, state);

        let mut legs = legs.into_iter();
        for (segment, count) in self.segments.iter_mut().flatten().zip(counts) {
            segment.legs = legs.by_ref().take(count).collect();
        }

        self.generation += 1;
        debug!(plan = self.plan_index, from_index, generation = self.generation, "plan calculated");
        self.emit(PlanEvent::Calculated {
            from_index,
            generation: self.generation,
        });
        self.generation
    }

    fn reflow(&mut self) {
        let mut offset = 0;
        for (segment_index, slot) in self.segments.iter_mut().enumerate() {
            if let Some(segment) = slot {
                segment.segment_index = segment_index;
                segment.offset = offset;
                offset += segment.legs.len();
            }
        }
        self.length = offset;
        self.active_lateral_leg = self.clamp_leg_index(self.active_lateral_leg);
        self.active_vertical_leg = self.clamp_leg_index(self.active_vertical_leg);
        self.active_calculating_leg = self.clamp_leg_index(self.active_calculating_leg);
    }

    fn emit(&self, event: PlanEvent) {
        // no subscribers is fine
        let _ = self.events.send(PlanNotification::new(self.plan_index, event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::legs::{FlightPlanLeg, LegType};

    fn leg(ident: &str) -> LegDefinition {
        FlightPlanLeg::new(LegType::Tf).fix(ident).into()
    }

    fn sample_plan() -> FlightPlan {
        let mut plan = FlightPlan::new(0);
        let departure = plan.add_segment(SegmentType::Departure);
        let enroute = plan.add_segment(SegmentType::Enroute);
        let approach = plan.add_segment(SegmentType::Approach);
        for ident in ["D1", "D2"] {
            plan.add_leg(departure, leg(ident), None).unwrap();
        }
        for ident in ["E1", "E2", "E3"] {
            plan.add_leg(enroute, leg(ident), None).unwrap();
        }
        plan.add_leg(approach, leg("A1"), None).unwrap();
        plan
    }

    fn idents(plan: &FlightPlan) -> Vec<String> {
        plan.legs().filter_map(|l| l.leg.fix_ident.clone()).collect()
    }

    #[test]
    fn test_reflow_offsets() {
        let mut plan = sample_plan();
        assert_eq!(plan.length(), 6);
        assert_eq!(plan.get_segment(1).unwrap().offset, 2);
        assert_eq!(plan.get_segment(2).unwrap().offset, 5);

        let global = plan.add_leg(0, leg("D0"), Some(0)).unwrap();
        assert_eq!(global, 0);
        assert_eq!(plan.get_segment(1).unwrap().offset, 3);
        assert_eq!(plan.get_segment(2).unwrap().offset, 6);
        assert_eq!(plan.length(), 7);

        plan.remove_leg(1, 1).unwrap();
        assert_eq!(idents(&plan), ["D0", "D1", "D2", "E1", "E3", "A1"]);
        assert_eq!(plan.get_segment(2).unwrap().offset, 5);
    }

    #[test]
    fn test_remove_segment_leaves_tombstone() {
        let mut plan = sample_plan();
        let removed = plan.remove_segment(1).unwrap();
        assert_eq!(removed.legs.len(), 3);
        assert_eq!(plan.segment_count(), 3);
        assert_eq!(plan.get_segment(1), Err(not_found("segment", 1)));
        assert_eq!(plan.get_segment(2).unwrap().offset, 2);
        assert_eq!(plan.length(), 3);

        // the tombstone is reused
        plan.insert_segment(1, SegmentType::Arrival).unwrap();
        assert_eq!(plan.segment_count(), 3);
        assert_eq!(plan.get_segment(1).unwrap().segment_type, SegmentType::Arrival);
    }

    #[test]
    fn test_insert_segment_shifts_later_segments() {
        let mut plan = sample_plan();
        plan.insert_segment(1, SegmentType::Enroute).unwrap();
        assert_eq!(plan.segment_count(), 4);
        assert_eq!(plan.get_segment(2).unwrap().segment_type, SegmentType::Enroute);
        assert_eq!(plan.get_segment(2).unwrap().segment_index, 2);
        assert_eq!(plan.get_segment(3).unwrap().offset, 5);
    }

    #[test]
    fn test_not_found_and_out_of_range_differ() {
        let mut plan = sample_plan();
        assert_eq!(plan.get_leg(6).unwrap_err(), FlightPlanError::NotFound { kind: "leg", index: 6 });
        assert_eq!(
            plan.insert_segment(9, SegmentType::Enroute).unwrap_err(),
            FlightPlanError::OutOfRange { index: 9, len: 3 }
        );
        assert_eq!(
            plan.add_leg(0, leg("X"), Some(5)).unwrap_err(),
            FlightPlanError::OutOfRange { index: 5, len: 2 }
        );
        assert!(matches!(plan.remove_leg(7, 0), Err(FlightPlanError::NotFound { kind: "segment", .. })));
    }

    #[test]
    fn test_leg_lookup_by_global_index() {
        let plan = sample_plan();
        assert_eq!(plan.segment_index_of_leg(0).unwrap(), 0);
        assert_eq!(plan.segment_index_of_leg(4).unwrap(), 1);
        assert_eq!(plan.segment_index_of_leg(5).unwrap(), 2);
        assert_eq!(plan.get_leg(3).unwrap().leg.fix_ident.as_deref(), Some("E2"));
    }

    #[test]
    fn test_active_indices_clamped() {
        let mut plan = sample_plan();
        assert_eq!(plan.set_lateral_leg_index(42), 5);
        assert_eq!(plan.set_vertical_leg_index(3), 3);
        assert_eq!(plan.set_calculating_leg_index(4), 4);
        plan.remove_segment(2).unwrap();
        plan.remove_segment(1).unwrap();
        assert_eq!(plan.active_lateral_leg_index(), 1);
        assert_eq!(plan.active_vertical_leg_index(), 1);

        let mut empty = FlightPlan::new(1);
        assert_eq!(empty.set_lateral_leg_index(3), 0);
    }

    #[test]
    fn test_copy_is_deep() {
        let mut plan = sample_plan();
        plan.set_lateral_leg_index(2);
        plan.set_user_data("cruise", serde_json::json!({ "altitude": 11000 }));
        plan.update_procedure_details(|details| details.departure = Some("ABC1".to_string()));
        plan.set_direct_to_data(Some(DirectToData { target_leg_index: 3, intercept_course: None })).unwrap();

        let mut copy = plan.copy(7);
        assert_eq!(copy.plan_index(), 7);
        assert_eq!(copy.active_lateral_leg_index(), 2);
        assert_eq!(copy.procedure_details().departure.as_deref(), Some("ABC1"));
        assert_eq!(copy.user_data("cruise"), plan.user_data("cruise"));
        assert_eq!(copy.direct_to_data(), plan.direct_to_data());

        copy.remove_leg(0, 0).unwrap();
        copy.delete_user_data("cruise");
        assert_eq!(plan.length(), 6);
        assert!(plan.user_data("cruise").is_some());
    }

    #[test]
    fn test_direct_to_marks_only_the_target() {
        let mut plan = sample_plan();
        let data = DirectToData { target_leg_index: 2, intercept_course: Some(90.0) };
        plan.set_direct_to_data(Some(data)).unwrap();
        let data = DirectToData { target_leg_index: 4, intercept_course: None };
        plan.set_direct_to_data(Some(data)).unwrap();

        let targets: Vec<usize> = (0..plan.length())
            .filter(|&i| plan.get_leg(i).unwrap().flags.contains(LegDefinitionFlags::DIRECT_TO_TARGET))
            .collect();
        assert_eq!(targets, [4]);
        assert_eq!(plan.get_leg(2).unwrap().selected_course, None);

        let missing = DirectToData { target_leg_index: 6, intercept_course: None };
        assert_eq!(plan.set_direct_to_data(Some(missing)).unwrap_err(), not_found("leg", 6));
        assert_eq!(plan.direct_to_data().map(|d| d.target_leg_index), Some(4));

        plan.set_direct_to_data(None).unwrap();
        assert!(plan.legs().all(|l| !l.flags.contains(LegDefinitionFlags::DIRECT_TO_TARGET)));
    }

    #[test]
    fn test_obs_course_is_set_and_cleared() {
        let mut plan = sample_plan();
        let mut rx = plan.subscribe();
        plan.set_obs_course(3, Some(270.0)).unwrap();
        let leg = plan.get_leg(3).unwrap();
        assert!(leg.flags.contains(LegDefinitionFlags::OBS));
        assert_eq!(leg.selected_course, Some(270.0));
        assert_eq!(rx.try_recv().unwrap().event, PlanEvent::ObsChanged { global_index: 3, course: Some(270.0) });

        // clearing a direct-to keeps the OBS course
        plan.set_direct_to_data(Some(DirectToData { target_leg_index: 3, intercept_course: None })).unwrap();
        plan.set_direct_to_data(None).unwrap();
        assert!(plan.get_leg(3).unwrap().flags.contains(LegDefinitionFlags::OBS));
        assert_eq!(plan.get_leg(3).unwrap().selected_course, Some(270.0));

        plan.set_obs_course(3, None).unwrap();
        let leg = plan.get_leg(3).unwrap();
        assert!(!leg.flags.contains(LegDefinitionFlags::OBS));
        assert_eq!(leg.selected_course, None);
        assert!(plan.set_obs_course(9, Some(10.0)).is_err());
    }

    #[test]
    fn test_structural_changes_are_announced() {
        let mut plan = FlightPlan::new(3);
        let mut rx = plan.subscribe();
        let segment = plan.add_segment(SegmentType::Enroute);
        plan.add_leg(segment, leg("E1"), None).unwrap();
        plan.set_user_data("k", Value::Bool(true));

        let first = rx.try_recv().unwrap();
        assert_eq!(first.plan_index, 3);
        assert_eq!(first.event, PlanEvent::SegmentInserted { segment_index: 0 });
        assert_eq!(
            rx.try_recv().unwrap().event,
            PlanEvent::LegAdded { segment_index: 0, global_index: 0 }
        );
        assert_eq!(rx.try_recv().unwrap().event, PlanEvent::UserDataChanged { key: "k".to_string() });
    }
}
