//! Plan tool: replace the goal/phase breakdown or move the phase pointer.

use serde::Deserialize;
use serde_json::{Value, json};
use stepwise_core::error::{PlanError, ToolError};
use stepwise_core::plan::{Phase, PlanTracker};
use stepwise_core::tool::{FieldSchema, ToolKind, ToolSchema};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum PlanAction {
    Update,
    Advance,
}

#[derive(Debug, Deserialize)]
struct PlanInput {
    action: PlanAction,
    #[serde(default)]
    goal: String,
    current_phase_id: Option<i64>,
    next_phase_id: Option<i64>,
    #[serde(default)]
    phases: Vec<Phase>,
}

pub fn schema() -> ToolSchema {
    ToolSchema::new(
        ToolKind::Plan,
        "Create or update the task plan. Use 'update' to set the goal and phase breakdown, \
         and 'advance' to move to the next phase once the current one is done.",
        vec![
            FieldSchema::string("action", "update replaces the plan; advance moves to next_phase_id")
                .one_of(&["update", "advance"])
                .required(),
            FieldSchema::string("goal", "The overall goal of the task"),
            FieldSchema::integer("current_phase_id", "Id of the phase currently being worked on")
                .required(),
            FieldSchema::integer("next_phase_id", "Id of the phase to move to (advance only)"),
            FieldSchema::array(
                "phases",
                "Ordered phase breakdown (update only)",
                json!({
                    "type": "object",
                    "properties": {
                        "id": {"type": "integer"},
                        "title": {"type": "string"},
                        "capabilities": {"type": "object"}
                    },
                    "required": ["id", "title"]
                }),
            ),
        ],
    )
}

/// Apply a plan call to the run's tracker.
pub fn handle(input: Value, tracker: &mut PlanTracker) -> Result<Value, ToolError> {
    let input: PlanInput = serde_json::from_value(input)
        .map_err(|e| ToolError::InvalidArguments(format!("plan: {e}")))?;

    match input.action {
        PlanAction::Update => {
            let plan = tracker.replace(input.goal, input.phases, input.current_phase_id)?;
            Ok(json!({
                "message": format!("Plan updated with {} phases", plan.phases.len()),
                "plan": plan,
            }))
        }
        PlanAction::Advance => {
            if tracker.plan().is_none() {
                return Err(PlanError::NoActivePlan.into());
            }
            let next = input.next_phase_id.ok_or_else(|| {
                ToolError::InvalidArguments("plan: 'advance' requires next_phase_id".into())
            })?;
            let current = tracker.advance(next)?;
            Ok(json!({
                "message": format!("Advanced to phase {current}"),
                "current_phase_id": current,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update_input() -> Value {
        json!({
            "action": "update",
            "goal": "Ship the report",
            "current_phase_id": 1,
            "phases": [
                {"id": 1, "title": "Research", "capabilities": {"shell": true}},
                {"id": 2, "title": "Write"}
            ]
        })
    }

    #[test]
    fn update_replaces_plan() {
        let mut tracker = PlanTracker::new();
        let payload = handle(update_input(), &mut tracker).unwrap();

        assert_eq!(payload["plan"]["goal"], "Ship the report");
        assert_eq!(payload["plan"]["phases"][1]["title"], "Write");
        let plan = tracker.plan().unwrap();
        assert_eq!(plan.current_phase_id, Some(1));
        assert_eq!(plan.current_phase().unwrap().title, "Research");
    }

    #[test]
    fn advance_before_update_is_no_active_plan() {
        let mut tracker = PlanTracker::new();
        let err = handle(
            json!({"action": "advance", "current_phase_id": 1, "next_phase_id": 2}),
            &mut tracker,
        )
        .unwrap_err();

        assert!(matches!(err, ToolError::Plan(PlanError::NoActivePlan)));
        assert!(!err.counts_toward_threshold());
        assert!(tracker.plan().is_none());
    }

    #[test]
    fn advance_without_target_before_update_is_no_active_plan() {
        let mut tracker = PlanTracker::new();
        let err = handle(json!({"action": "advance", "current_phase_id": 1}), &mut tracker)
            .unwrap_err();

        assert!(matches!(err, ToolError::Plan(PlanError::NoActivePlan)));
        assert!(!err.counts_toward_threshold());
        assert!(tracker.plan().is_none());
    }

    #[test]
    fn advance_accepts_undeclared_phase() {
        let mut tracker = PlanTracker::new();
        handle(update_input(), &mut tracker).unwrap();

        let payload = handle(
            json!({"action": "advance", "current_phase_id": 1, "next_phase_id": 99}),
            &mut tracker,
        )
        .unwrap();
        assert_eq!(payload["current_phase_id"], 99);
        assert_eq!(tracker.plan().unwrap().current_phase_id, Some(99));
    }

    #[test]
    fn advance_without_target_is_malformed() {
        let mut tracker = PlanTracker::new();
        handle(update_input(), &mut tracker).unwrap();

        let err = handle(json!({"action": "advance", "current_phase_id": 1}), &mut tracker)
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
        assert_eq!(tracker.plan().unwrap().current_phase_id, Some(1));
    }

    #[test]
    fn duplicate_phase_ids_rejected() {
        let mut tracker = PlanTracker::new();
        let err = handle(
            json!({
                "action": "update",
                "goal": "g",
                "current_phase_id": 1,
                "phases": [{"id": 1, "title": "a"}, {"id": 1, "title": "b"}]
            }),
            &mut tracker,
        )
        .unwrap_err();
        assert!(matches!(err, ToolError::Plan(PlanError::DuplicatePhaseId(1))));
        assert!(err.counts_toward_threshold());
    }
}
