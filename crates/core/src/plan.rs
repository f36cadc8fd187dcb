//! Goal/phase tracking.
//!
//! The tracker stores whatever breakdown the model last sent and moves the
//! phase pointer when asked. It does not reason about phase order or
//! capabilities; that is left to the model.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use crate::error::PlanError;

/// A named unit of work within a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub id: i64,

    #[serde(default)]
    pub title: String,

    /// Free-form capability flags declared by the model
    #[serde(default)]
    pub capabilities: serde_json::Map<String, serde_json::Value>,
}

/// The current goal and its phase breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub goal: String,
    pub phases: Vec<Phase>,
    /// Not checked against `phases`.
    pub current_phase_id: Option<i64>,
}

impl Plan {
    /// The phase the pointer currently refers to, if it names a declared phase.
    pub fn current_phase(&self) -> Option<&Phase> {
        let id = self.current_phase_id?;
        self.phases.iter().find(|p| p.id == id)
    }
}

/// Owner of the run's plan.
#[derive(Debug, Clone, Default)]
pub struct PlanTracker {
    plan: Option<Plan>,
}

impl PlanTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plan(&self) -> Option<&Plan> {
        self.plan.as_ref()
    }

    /// Overwrite the held plan.
    ///
    /// `current_phase_id` is accepted as given, even when no phase carries
    /// that id. A phase list with repeated ids is rejected and leaves the
    /// previous plan in place.
    pub fn replace(
        &mut self,
        goal: impl Into<String>,
        phases: Vec<Phase>,
        current_phase_id: Option<i64>,
    ) -> Result<&Plan, PlanError> {
        let mut seen = HashSet::with_capacity(phases.len());
        for phase in &phases {
            if !seen.insert(phase.id) {
                return Err(PlanError::DuplicatePhaseId(phase.id));
            }
        }

        let plan: &Plan = self.plan.insert(Plan {
            goal: goal.into(),
            phases,
            current_phase_id,
        });
        Ok(plan)
    }

    /// Move the phase pointer to `next_phase_id`.
    ///
    /// Any id is accepted, including ids not in the phase list and the
    /// current id itself.
    pub fn advance(&mut self, next_phase_id: i64) -> Result<i64, PlanError> {
        let plan = self.plan.as_mut().ok_or(PlanError::NoActivePlan)?;
        plan.current_phase_id = Some(next_phase_id);
        Ok(next_phase_id)
    }

    pub fn into_plan(self) -> Option<Plan> {
        self.plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phase(id: i64, title: &str) -> Phase {
        Phase {
            id,
            title: title.into(),
            capabilities: serde_json::Map::new(),
        }
    }

    #[test]
    fn advance_without_plan_fails() {
        let mut tracker = PlanTracker::new();
        assert_eq!(tracker.advance(2), Err(PlanError::NoActivePlan));
        assert!(tracker.plan().is_none());
    }

    #[test]
    fn replace_then_advance() {
        let mut tracker = PlanTracker::new();
        tracker
            .replace("ship it", vec![phase(1, "build"), phase(2, "deliver")], Some(1))
            .unwrap();
        assert_eq!(tracker.plan().unwrap().current_phase().unwrap().title, "build");

        assert_eq!(tracker.advance(2).unwrap(), 2);
        assert_eq!(tracker.plan().unwrap().current_phase_id, Some(2));
    }

    #[test]
    fn advance_accepts_undeclared_phase() {
        let mut tracker = PlanTracker::new();
        tracker.replace("goal", vec![phase(1, "only")], Some(1)).unwrap();
        assert_eq!(tracker.advance(99).unwrap(), 99);
        let plan = tracker.plan().unwrap();
        assert_eq!(plan.current_phase_id, Some(99));
        assert!(plan.current_phase().is_none());
    }

    #[test]
    fn replace_accepts_undeclared_current_phase() {
        let mut tracker = PlanTracker::new();
        let plan = tracker.replace("goal", vec![phase(1, "a")], Some(7)).unwrap();
        assert_eq!(plan.current_phase_id, Some(7));
    }

    #[test]
    fn replace_overwrites_previous_plan() {
        let mut tracker = PlanTracker::new();
        tracker.replace("first", vec![phase(1, "a")], Some(1)).unwrap();
        tracker.replace("second", vec![phase(5, "b")], None).unwrap();
        let plan = tracker.plan().unwrap();
        assert_eq!(plan.goal, "second");
        assert_eq!(plan.phases.len(), 1);
        assert_eq!(plan.current_phase_id, None);
    }

    #[test]
    fn duplicate_phase_ids_rejected() {
        let mut tracker = PlanTracker::new();
        tracker.replace("kept", vec![phase(1, "a")], Some(1)).unwrap();
        let err = tracker
            .replace("bad", vec![phase(1, "a"), phase(1, "b")], Some(1))
            .unwrap_err();
        assert_eq!(err, PlanError::DuplicatePhaseId(1));
        assert_eq!(tracker.plan().unwrap().goal, "kept");
    }
}
