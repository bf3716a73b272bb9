//! Serialized, coalescing calculation entry point for one flight plan.
//!
//! Requests are stamped with a ticket. When a request gets the plan lock but
//! a newer request is already waiting, it is abandoned and the newer one
//! calculates from the smallest index any pending request asked for.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, MappedMutexGuard, Mutex, MutexGuard};
use tracing::debug;

use crate::calculator::FlightPathCalculator;
use crate::error::FlightPlanError;
use crate::plan::{FlightPlan, PlanNotification};
use crate::state::AircraftState;

const NO_PENDING: usize = usize::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CalculationOutcome {
    Completed { from_index: usize, generation: u64 },
    /// A later request took over this one's work.
    Superseded { ticket: u64 },
}

struct Inner {
    plan: FlightPlan,
    state: Option<AircraftState>,
}

pub struct PlanCalculationService {
    inner: Mutex<Inner>,
    calculator: Arc<FlightPathCalculator>,
    events: broadcast::Sender<PlanNotification>,
    plan_index: usize,
    latest_ticket: AtomicU64,
    pending_from: AtomicUsize,
}

impl PlanCalculationService {
    pub fn new(plan: FlightPlan, calculator: Arc<FlightPathCalculator>) -> Self {
        Self {
            events: plan.event_sender(),
            plan_index: plan.plan_index(),
            inner: Mutex::new(Inner { plan, state: None }),
            calculator,
            latest_ticket: AtomicU64::new(0),
            pending_from: AtomicUsize::new(NO_PENDING),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlanNotification> {
        self.events.subscribe()
    }

    /// Exclusive access to the plan for edits between calculations.
    pub async fn plan(&self) -> MappedMutexGuard<'_, FlightPlan> {
        MutexGuard::map(self.inner.lock().await, |inner| &mut inner.plan)
    }

    pub async fn set_aircraft_state(&self, state: Option<AircraftState>) {
        self.inner.lock().await.state = state;
    }

    /// Recalculate from `from_index`, unless a newer request supersedes this one.
    pub async fn calculate(&self, from_index: usize) -> CalculationOutcome {
        let ticket = self.register(from_index);
        let mut inner = self.inner.lock().await;
        self.run(&mut inner, ticket)
    }

    /// Like [`PlanCalculationService::calculate`], but fails with
    /// [`FlightPlanError::Busy`] instead of waiting for a running calculation.
    pub fn try_calculate(&self, from_index: usize) -> Result<CalculationOutcome, FlightPlanError> {
        let mut inner = self.inner.try_lock().map_err(|_| FlightPlanError::Busy(self.plan_index))?;
        let ticket = self.register(from_index);
        Ok(self.run(&mut inner, ticket))
    }

    fn register(&self, from_index: usize) -> u64 {
        self.pending_from.fetch_min(from_index, Ordering::SeqCst);
        self.latest_ticket.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn run(&self, inner: &mut Inner, ticket: u64) -> CalculationOutcome {
        if self.latest_ticket.load(Ordering::SeqCst) != ticket {
            debug!(plan = self.plan_index, ticket, "calculation superseded");
            return CalculationOutcome::Superseded { ticket };
        }
        let from_index = self.pending_from.swap(NO_PENDING, Ordering::SeqCst);
        if from_index == NO_PENDING {
            // an earlier run already covered this request
            let generation = inner.plan.generation();
            return CalculationOutcome::Completed {
                from_index: inner.plan.length(),
                generation,
            };
        }
        let Inner { plan, state } = inner;
        let generation = plan.calculate(&self.calculator, from_index, state.as_ref());
        CalculationOutcome::Completed { from_index, generation }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FlightPathCalculatorOptions;
    use crate::facility::{Facility, FacilityKind, FacilityStore, NoMagVar};
    use crate::geo::GeoPoint;
    use crate::legs::{FlightPlanLeg, LegType};
    use crate::plan::{PlanEvent, SegmentType};

    fn service() -> Arc<PlanCalculationService> {
        let store: FacilityStore = [
            Facility::new("ONE", FacilityKind::Waypoint, GeoPoint::new(10.0, 10.0)),
            Facility::new("TWO", FacilityKind::Waypoint, GeoPoint::new(10.0, 10.5)),
            Facility::new("THR", FacilityKind::Waypoint, GeoPoint::new(10.5, 10.5)),
        ]
        .into_iter()
        .collect();
        let calculator = FlightPathCalculator::new(Arc::new(store), Arc::new(NoMagVar), FlightPathCalculatorOptions::default());

        let mut plan = FlightPlan::new(0);
        let segment = plan.add_segment(SegmentType::Enroute);
        plan.add_leg(segment, FlightPlanLeg::new(LegType::If).fix("ONE").into(), None).unwrap();
        plan.add_leg(segment, FlightPlanLeg::new(LegType::Tf).fix("TWO").into(), None).unwrap();
        plan.add_leg(segment, FlightPlanLeg::new(LegType::Tf).fix("THR").into(), None).unwrap();
        Arc::new(PlanCalculationService::new(plan, Arc::new(calculator)))
    }

    #[tokio::test]
    async fn test_calculate_notifies() {
        let service = service();
        let mut rx = service.subscribe();
        let outcome = service.calculate(0).await;
        assert_eq!(outcome, CalculationOutcome::Completed { from_index: 0, generation: 1 });

        let notification = rx.recv().await.unwrap();
        assert_eq!(notification.event, PlanEvent::Calculated { from_index: 0, generation: 1 });
        assert!(service.plan().await.get_leg(2).unwrap().calculated.is_some());
    }

    #[tokio::test]
    async fn test_overlapping_requests_coalesce() {
        let service = service();
        let guard = service.plan().await;

        let mut handles = Vec::new();
        for from_index in [2, 1, 2] {
            let service = service.clone();
            handles.push(tokio::spawn(async move { service.calculate(from_index).await }));
        }
        // let every request register and queue on the lock
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        drop(guard);

        let mut outcomes = Vec::new();
        for handle in handles {
            outcomes.push(handle.await.unwrap());
        }
        assert_eq!(outcomes[0], CalculationOutcome::Superseded { ticket: 1 });
        assert_eq!(outcomes[1], CalculationOutcome::Superseded { ticket: 2 });
        assert_eq!(outcomes[2], CalculationOutcome::Completed { from_index: 1, generation: 1 });
    }

    #[tokio::test]
    async fn test_try_calculate_while_busy() {
        let service = service();
        let guard = service.plan().await;
        assert_eq!(service.try_calculate(0), Err(FlightPlanError::Busy(0)));
        drop(guard);
        assert!(matches!(service.try_calculate(0), Ok(CalculationOutcome::Completed { .. })));
    }
}
