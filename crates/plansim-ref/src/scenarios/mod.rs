//! Walk-through scenarios for the plan engine.
//!
//! Each scenario wires a real `PlanService` (runner, virtual state store,
//! trace recorder, validator) from the embedded configuration, attaches mock
//! collaborators where it needs them, and prints what happened step by step.

pub mod agent_decision;
pub mod graph_plan;
pub mod live_execution;
pub mod payment_flow;

use serde_json::Value;

use plansim_contracts::{action::ExecutionAction, error::EngineResult, trace::RunOutcome};

/// Parse a list of wire-format actions.
pub(crate) fn actions(values: Vec<Value>) -> EngineResult<Vec<ExecutionAction>> {
    values.into_iter().map(ExecutionAction::from_json).collect()
}

/// One line per step, then the tallies.
pub(crate) fn print_outcome(outcome: &RunOutcome) {
    for (i, step) in outcome.trace.steps.iter().enumerate() {
        let detail = match (&step.error, &step.result) {
            (Some(message), _) => message.clone(),
            (None, Some(payload)) => payload.to_string(),
            (None, None) => String::new(),
        };
        println!(
            "  [{i}] {:<14} {:<10} {}",
            step.action.kind_name(),
            format!("{:?}", step.status).to_lowercase(),
            detail
        );
    }
    for warning in &outcome.trace.warnings {
        println!("  warning: {warning}");
    }
    println!(
        "  Run:      {} ({:?}, {}/{} steps ok, gas {})",
        if outcome.success { "success" } else { "failed" },
        outcome.trace.status,
        outcome.summary.successful_steps,
        outcome.summary.total_steps,
        outcome.summary.total_gas_used
    );
}
