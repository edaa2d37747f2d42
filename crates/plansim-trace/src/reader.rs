//! Read-only access to recorded traces for outside consumers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use plansim_contracts::{
    plan::{ExecutionMode, RunId},
    trace::{ExecutionTrace, RunSummary, TraceStatus},
};

use crate::recorder::{lock, TraceMap};

/// One line of a run listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceSummary {
    pub run_id: RunId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<String>,
    pub mode: ExecutionMode,
    pub status: TraceStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
    pub summary: RunSummary,
}

impl From<&ExecutionTrace> for TraceSummary {
    fn from(trace: &ExecutionTrace) -> Self {
        Self {
            run_id: trace.run_id,
            plan_id: trace.plan_id.clone(),
            mode: trace.mode,
            status: trace.status,
            started_at: trace.started_at,
            ended_at: trace.ended_at,
            duration_ms: trace.duration_ms,
            summary: trace.summary(),
        }
    }
}

/// Snapshots only. Holding a reader never blocks the recorder for longer
/// than one clone.
#[derive(Clone)]
pub struct TraceReader {
    traces: TraceMap,
}

impl TraceReader {
    pub(crate) fn new(traces: TraceMap) -> Self {
        Self { traces }
    }

    pub fn get(&self, run_id: &RunId) -> Option<ExecutionTrace> {
        lock(&self.traces).get(run_id).cloned()
    }

    pub fn summary(&self, run_id: &RunId) -> Option<TraceSummary> {
        lock(&self.traces).get(run_id).map(TraceSummary::from)
    }

    /// Every run, oldest first.
    pub fn list(&self) -> Vec<TraceSummary> {
        let mut listing: Vec<TraceSummary> =
            lock(&self.traces).values().map(TraceSummary::from).collect();
        listing.sort_by(|a, b| {
            a.started_at
                .cmp(&b.started_at)
                .then_with(|| a.run_id.cmp(&b.run_id))
        });
        listing
    }

    /// Runs not yet completed or failed.
    pub fn active_count(&self) -> usize {
        lock(&self.traces)
            .values()
            .filter(|t| !t.status.is_terminal())
            .count()
    }

    pub fn len(&self) -> usize {
        lock(&self.traces).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
