//! Execution trace, run summary and run outcome types.
//!
//! One `ExecutionTrace` exists per run. It is append-only until it reaches
//! `Completed` or `Failed`; the recorder enforces that, these types only
//! describe it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    plan::{ExecutionMode, RunId},
    result::{ActionResult, ActionStatus},
    state::VirtualState,
};

/// Lifecycle of a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TraceStatus {
    /// True once no further entries may be appended.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TraceStatus::Completed | TraceStatus::Failed)
    }
}

/// The ordered record of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionTrace {
    pub run_id: RunId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<String>,
    pub mode: ExecutionMode,
    pub status: TraceStatus,
    /// Number of actions in the plan; `steps` never grows past it.
    pub expected_steps: usize,
    pub steps: Vec<ActionResult>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    /// Virtual state as of the last appended step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_snapshot: Option<VirtualState>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl ExecutionTrace {
    /// A fresh trace in `Pending`.
    pub fn new(
        run_id: RunId,
        plan_id: Option<String>,
        mode: ExecutionMode,
        expected_steps: usize,
    ) -> Self {
        Self {
            run_id,
            plan_id,
            mode,
            status: TraceStatus::Pending,
            expected_steps,
            steps: Vec::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
            state_snapshot: None,
            started_at: Utc::now(),
            ended_at: None,
            duration_ms: None,
            failure_reason: None,
        }
    }

    /// Tally the steps recorded so far.
    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary {
            total_steps: self.expected_steps,
            executed_steps: self.steps.len(),
            ..RunSummary::default()
        };

        for step in &self.steps {
            match step.status {
                ActionStatus::Success | ActionStatus::Simulated => summary.successful_steps += 1,
                ActionStatus::Pending => summary.pending_steps += 1,
                ActionStatus::Error => summary.failed_steps += 1,
            }
            if let Some(gas) = &step.gas {
                summary.total_gas_used = summary.total_gas_used.saturating_add(gas.gas_used);
                summary.total_estimated_cost = summary
                    .total_estimated_cost
                    .checked_add(gas.estimated_cost)
                    .unwrap_or(Decimal::MAX);
            }
        }

        summary.total_estimated_cost = summary.total_estimated_cost.normalize();
        summary
    }
}

/// Step and gas tallies for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// Actions in the plan.
    pub total_steps: usize,
    /// Actions actually dispatched.
    pub executed_steps: usize,
    pub successful_steps: usize,
    pub failed_steps: usize,
    pub pending_steps: usize,
    pub total_gas_used: u64,
    pub total_estimated_cost: Decimal,
}

/// What `Runner::run` hands back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutcome {
    pub run_id: RunId,
    pub success: bool,
    pub trace: ExecutionTrace,
    pub summary: RunSummary,
}
