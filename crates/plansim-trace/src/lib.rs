//! # plansim-trace
//!
//! Append-only execution traces for the plansim engine.
//!
//! ## Overview
//!
//! [`InMemoryTraceRecorder`] implements
//! [`TraceRecorder`](plansim_core::traits::TraceRecorder): the runner opens
//! one trace per run, appends a step per dispatched action, and finalizes it
//! as completed or failed. After that the trace is frozen; every further
//! write returns `TraceFinalized`.
//!
//! Consumers that only need to look (a service facade, a CLI) take a
//! [`TraceReader`], which has no mutation methods at all.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use plansim_trace::InMemoryTraceRecorder;
//!
//! let recorder = InMemoryTraceRecorder::new();
//! let reader = recorder.reader();
//! // hand `recorder` to the Runner, keep `reader` for queries
//! ```

pub mod reader;
pub mod recorder;

pub use reader::{TraceReader, TraceSummary};
pub use recorder::InMemoryTraceRecorder;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{Duration, Utc};
    use serde_json::json;

    use plansim_contracts::{
        action::{ExecutionAction, ReadBalanceAction},
        error::EngineError,
        plan::{ExecutionMode, RunId},
        result::ActionResult,
        state::{VirtualState, Wallet},
        trace::TraceStatus,
    };
    use plansim_core::traits::TraceRecorder;

    use super::InMemoryTraceRecorder;

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn read() -> ExecutionAction {
        ExecutionAction::ReadBalance(ReadBalanceAction::default())
    }

    fn ok_step() -> ActionResult {
        ActionResult::success(read(), json!({ "balance": "10" }))
    }

    fn snapshot(run_id: RunId, address: &str) -> VirtualState {
        VirtualState {
            run_id,
            mode: ExecutionMode::Simulate,
            wallet: Wallet {
                address: address.to_string(),
                balances: BTreeMap::new(),
                nonce: None,
            },
            contracts: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    fn open(recorder: &InMemoryTraceRecorder, steps: usize) -> RunId {
        let run_id = RunId::new();
        recorder.create_trace(run_id, Some("plan-1".to_string()), ExecutionMode::Simulate, steps);
        run_id
    }

    // ── 1. lifecycle ──────────────────────────────────────────────────────────

    #[test]
    fn test_create_opens_running_trace() {
        let recorder = InMemoryTraceRecorder::new();
        let run_id = RunId::new();

        let trace = recorder.create_trace(run_id, None, ExecutionMode::Execute, 3);

        assert_eq!(trace.status, TraceStatus::Running);
        assert_eq!(trace.expected_steps, 3);
        assert!(trace.steps.is_empty());
        assert_eq!(recorder.get(&run_id).unwrap().mode, ExecutionMode::Execute);
    }

    #[test]
    fn test_complete_sets_timing() {
        let recorder = InMemoryTraceRecorder::new();
        let run_id = open(&recorder, 1);
        recorder.add_step(&run_id, ok_step(), None).unwrap();

        let trace = recorder.complete(&run_id).unwrap();

        assert_eq!(trace.status, TraceStatus::Completed);
        assert!(trace.ended_at.unwrap() >= trace.started_at);
        assert!(trace.duration_ms.unwrap() >= 0);
        assert!(trace.failure_reason.is_none());
    }

    #[test]
    fn test_fail_records_reason() {
        let recorder = InMemoryTraceRecorder::new();
        let run_id = open(&recorder, 2);

        let trace = recorder.fail(&run_id, "execution stopped at step 0").unwrap();

        assert_eq!(trace.status, TraceStatus::Failed);
        assert_eq!(trace.failure_reason.as_deref(), Some("execution stopped at step 0"));
        assert!(trace.ended_at.is_some());
    }

    // ── 2. append-only rules ──────────────────────────────────────────────────

    /// Nothing can be appended once the trace is finalized.
    #[test]
    fn test_finalized_trace_rejects_writes() {
        let recorder = InMemoryTraceRecorder::new();
        let run_id = open(&recorder, 3);
        recorder.complete(&run_id).unwrap();

        assert!(matches!(
            recorder.add_step(&run_id, ok_step(), None),
            Err(EngineError::TraceFinalized { .. })
        ));
        assert!(matches!(
            recorder.add_warning(&run_id, "late"),
            Err(EngineError::TraceFinalized { .. })
        ));
        assert!(matches!(recorder.fail(&run_id, "again"), Err(EngineError::TraceFinalized { .. })));
        assert_eq!(recorder.get(&run_id).unwrap().status, TraceStatus::Completed);
    }

    /// A trace never holds more steps than the plan has actions.
    #[test]
    fn test_step_count_is_bounded_by_plan() {
        let recorder = InMemoryTraceRecorder::new();
        let run_id = open(&recorder, 2);

        recorder.add_step(&run_id, ok_step(), None).unwrap();
        recorder.add_step(&run_id, ok_step(), None).unwrap();

        match recorder.add_step(&run_id, ok_step(), None) {
            Err(EngineError::TraceOverflow { limit, .. }) => assert_eq!(limit, 2),
            other => panic!("expected TraceOverflow, got {:?}", other),
        }
        assert_eq!(recorder.get(&run_id).unwrap().steps.len(), 2);
    }

    #[test]
    fn test_unknown_run_is_rejected() {
        let recorder = InMemoryTraceRecorder::new();
        let ghost = RunId::new();

        assert!(matches!(
            recorder.add_error(&ghost, "x"),
            Err(EngineError::UnknownRun { .. })
        ));
        assert!(recorder.get(&ghost).is_none());
    }

    /// Each step refreshes the snapshot; a step without one keeps the last.
    #[test]
    fn test_add_step_refreshes_snapshot() {
        let recorder = InMemoryTraceRecorder::new();
        let run_id = open(&recorder, 3);

        recorder.add_step(&run_id, ok_step(), Some(snapshot(run_id, "0xfirst"))).unwrap();
        recorder.add_step(&run_id, ok_step(), Some(snapshot(run_id, "0xsecond"))).unwrap();
        recorder.add_step(&run_id, ok_step(), None).unwrap();

        let trace = recorder.get(&run_id).unwrap();
        assert_eq!(trace.state_snapshot.unwrap().wallet.address, "0xsecond");
    }

    #[test]
    fn test_warnings_and_errors_keep_order() {
        let recorder = InMemoryTraceRecorder::new();
        let run_id = open(&recorder, 1);

        recorder.add_warning(&run_id, "w1").unwrap();
        recorder.add_error(&run_id, "e1").unwrap();
        recorder.add_warning(&run_id, "w2").unwrap();

        let trace = recorder.get(&run_id).unwrap();
        assert_eq!(trace.warnings, vec!["w1", "w2"]);
        assert_eq!(trace.errors, vec!["e1"]);
    }

    // ── 3. reader ─────────────────────────────────────────────────────────────

    #[test]
    fn test_reader_sees_recorder_writes() {
        let recorder = InMemoryTraceRecorder::new();
        let reader = recorder.reader();
        let first = open(&recorder, 1);
        let second = open(&recorder, 2);

        recorder.add_step(&first, ok_step(), None).unwrap();
        recorder.complete(&first).unwrap();

        let listing = reader.list();
        assert_eq!(listing.len(), 2);
        assert_eq!(reader.active_count(), 1);

        let summary = reader.summary(&first).unwrap();
        assert_eq!(summary.status, TraceStatus::Completed);
        assert_eq!(summary.summary.successful_steps, 1);
        assert_eq!(summary.plan_id.as_deref(), Some("plan-1"));

        assert_eq!(reader.get(&second).unwrap().expected_steps, 2);
    }

    // ── 4. eviction ───────────────────────────────────────────────────────────

    #[test]
    fn test_evict_older_than() {
        let recorder = InMemoryTraceRecorder::new();
        let old = open(&recorder, 1);
        let fresh = open(&recorder, 1);

        crate::recorder::lock(&recorder.traces)
            .get_mut(&old)
            .unwrap()
            .started_at -= Duration::hours(3);

        assert_eq!(recorder.evict_older_than(Duration::hours(1)), 1);
        assert!(recorder.get(&old).is_none());
        assert!(recorder.get(&fresh).is_some());
        assert!(!recorder.reader().is_empty());
    }

    #[test]
    fn test_evict_with_unbounded_window_keeps_traces() {
        let recorder = InMemoryTraceRecorder::new();
        let run = open(&recorder, 1);

        assert_eq!(recorder.evict_older_than(Duration::seconds(i64::MAX / 1000)), 0);
        assert!(recorder.get(&run).is_some());
    }
}
