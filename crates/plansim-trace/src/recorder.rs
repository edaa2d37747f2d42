//! In-memory implementation of `TraceRecorder`.
//!
//! Traces live in one map behind a `Mutex`, shared with every `TraceReader`
//! handed out. Mutations go through `mutate`, which enforces the two trace
//! rules in one place: nothing is appended after `complete`/`fail`, and a
//! trace never holds more steps than its plan has actions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{Duration, Utc};
use tracing::{debug, info, warn};

use plansim_contracts::{
    error::{EngineError, EngineResult},
    plan::{ExecutionMode, RunId},
    result::ActionResult,
    state::VirtualState,
    trace::{ExecutionTrace, TraceStatus},
};
use plansim_core::traits::TraceRecorder;

use crate::reader::TraceReader;

pub(crate) type TraceMap = Arc<Mutex<HashMap<RunId, ExecutionTrace>>>;

pub(crate) fn lock(traces: &TraceMap) -> MutexGuard<'_, HashMap<RunId, ExecutionTrace>> {
    traces.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Process-wide map of run id → trace.
#[derive(Clone, Default)]
pub struct InMemoryTraceRecorder {
    pub(crate) traces: TraceMap,
}

impl InMemoryTraceRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A read-only view over the same traces.
    pub fn reader(&self) -> TraceReader {
        TraceReader::new(Arc::clone(&self.traces))
    }

    /// Drop traces started more than `max_age` ago. Returns how many went.
    pub fn evict_older_than(&self, max_age: Duration) -> usize {
        let Some(cutoff) = Utc::now().checked_sub_signed(max_age) else {
            return 0;
        };
        let mut traces = lock(&self.traces);
        let before = traces.len();
        traces.retain(|_, trace| trace.started_at >= cutoff);
        let evicted = before - traces.len();
        if evicted > 0 {
            info!(evicted, remaining = traces.len(), "evicted expired traces");
        }
        evicted
    }

    fn mutate<T>(
        &self,
        run_id: &RunId,
        f: impl FnOnce(&mut ExecutionTrace) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let mut traces = lock(&self.traces);
        let trace = traces.get_mut(run_id).ok_or_else(|| EngineError::UnknownRun {
            run_id: run_id.to_string(),
        })?;

        if trace.status.is_terminal() {
            warn!(run_id = %run_id, status = ?trace.status, "write to finalized trace rejected");
            return Err(EngineError::TraceFinalized {
                run_id: run_id.to_string(),
            });
        }

        f(trace)
    }

    fn finalize(
        &self,
        run_id: &RunId,
        status: TraceStatus,
        reason: Option<&str>,
    ) -> EngineResult<ExecutionTrace> {
        self.mutate(run_id, |trace| {
            let ended_at = Utc::now();
            trace.status = status;
            trace.ended_at = Some(ended_at);
            trace.duration_ms = Some((ended_at - trace.started_at).num_milliseconds());
            trace.failure_reason = reason.map(str::to_string);

            info!(
                run_id = %run_id,
                status = ?status,
                steps = trace.steps.len(),
                duration_ms = trace.duration_ms.unwrap_or_default(),
                "trace finalized"
            );
            Ok(trace.clone())
        })
    }
}

impl TraceRecorder for InMemoryTraceRecorder {
    fn create_trace(
        &self,
        run_id: RunId,
        plan_id: Option<String>,
        mode: ExecutionMode,
        expected_steps: usize,
    ) -> ExecutionTrace {
        let mut trace = ExecutionTrace::new(run_id, plan_id, mode, expected_steps);
        trace.status = TraceStatus::Running;

        debug!(run_id = %run_id, mode = %mode, expected_steps, "trace opened");

        lock(&self.traces).insert(run_id, trace.clone());
        trace
    }

    fn add_step(
        &self,
        run_id: &RunId,
        result: ActionResult,
        snapshot: Option<VirtualState>,
    ) -> EngineResult<()> {
        self.mutate(run_id, |trace| {
            if trace.steps.len() >= trace.expected_steps {
                return Err(EngineError::TraceOverflow {
                    run_id: run_id.to_string(),
                    limit: trace.expected_steps,
                });
            }

            debug!(
                run_id = %run_id,
                step = trace.steps.len(),
                kind = %result.action.kind_name(),
                status = ?result.status,
                "step recorded"
            );

            trace.steps.push(result);
            if snapshot.is_some() {
                trace.state_snapshot = snapshot;
            }
            Ok(())
        })
    }

    fn add_warning(&self, run_id: &RunId, message: &str) -> EngineResult<()> {
        self.mutate(run_id, |trace| {
            trace.warnings.push(message.to_string());
            Ok(())
        })
    }

    fn add_error(&self, run_id: &RunId, message: &str) -> EngineResult<()> {
        self.mutate(run_id, |trace| {
            trace.errors.push(message.to_string());
            Ok(())
        })
    }

    fn complete(&self, run_id: &RunId) -> EngineResult<ExecutionTrace> {
        self.finalize(run_id, TraceStatus::Completed, None)
    }

    fn fail(&self, run_id: &RunId, reason: &str) -> EngineResult<ExecutionTrace> {
        self.finalize(run_id, TraceStatus::Failed, Some(reason))
    }

    fn get(&self, run_id: &RunId) -> Option<ExecutionTrace> {
        lock(&self.traces).get(run_id).cloned()
    }
}
