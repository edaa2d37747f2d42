//! The plan runner: the sequential, single-run dispatch loop.
//!
//! For each run:
//!
//!   order → create state → open trace → [reconcile with chain] →
//!   dispatch each step → append to trace → finalize
//!
//! The runner never looks at the mode to decide what to do after a failed
//! step; it consults the `ErrorPolicy` it was handed. `RunPolicy` supplies
//! the default per mode: simulation keeps going so every problem shows up,
//! live execution stops at the first failure.

use std::sync::Arc;

use tracing::{debug, info, warn};

use plansim_contracts::{
    action::ExecutionAction,
    error::{EngineError, EngineResult},
    plan::{ErrorPolicy, ExecutionMode, ExecutionPlan, RunId},
    trace::{ExecutionTrace, RunOutcome},
};

use crate::{
    builder::PlanBuilder,
    registry::ExecutorRegistry,
    traits::{ActionContext, ChainClient, DecisionClient, Ledger, StateStore, TraceRecorder},
};

/// Which `ErrorPolicy` each mode gets when the caller does not pass one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunPolicy {
    pub simulate: ErrorPolicy,
    pub execute: ErrorPolicy,
}

impl RunPolicy {
    pub fn for_mode(&self, mode: ExecutionMode) -> ErrorPolicy {
        match mode {
            ExecutionMode::Simulate => self.simulate,
            ExecutionMode::Execute => self.execute,
        }
    }
}

impl Default for RunPolicy {
    fn default() -> Self {
        Self {
            simulate: ErrorPolicy::ContinueOnError,
            execute: ErrorPolicy::FailFast,
        }
    }
}

/// The live half of the runner: a chain-backed ledger plus the client it
/// reconciles against.
pub struct LiveBackend {
    pub ledger: Arc<dyn Ledger>,
    pub chain: Arc<dyn ChainClient>,
}

/// Drives plans through the executor registry.
///
/// One runner serves many runs. Runs share nothing but the keyed stores, so
/// independent runs may proceed on separate threads.
pub struct Runner {
    registry: ExecutorRegistry,
    state: Arc<dyn StateStore>,
    traces: Arc<dyn TraceRecorder>,
    simulator: Arc<dyn Ledger>,
    live: Option<LiveBackend>,
    decision: Option<Arc<dyn DecisionClient>>,
    policy: RunPolicy,
    wallet_address: String,
}

impl Runner {
    /// A runner that can simulate. Add `with_live` to allow execute mode.
    pub fn new(
        registry: ExecutorRegistry,
        state: Arc<dyn StateStore>,
        traces: Arc<dyn TraceRecorder>,
        simulator: Arc<dyn Ledger>,
        wallet_address: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            state,
            traces,
            simulator,
            live: None,
            decision: None,
            policy: RunPolicy::default(),
            wallet_address: wallet_address.into(),
        }
    }

    pub fn with_live(mut self, live: LiveBackend) -> Self {
        self.live = Some(live);
        self
    }

    pub fn with_decision(mut self, decision: Arc<dyn DecisionClient>) -> Self {
        self.decision = Some(decision);
        self
    }

    pub fn with_policy(mut self, policy: RunPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> RunPolicy {
        self.policy
    }

    pub fn supports_live(&self) -> bool {
        self.live.is_some()
    }

    pub fn has_decision_client(&self) -> bool {
        self.decision.is_some()
    }

    pub fn registry(&self) -> &ExecutorRegistry {
        &self.registry
    }

    /// Run `plan` under the default policy for its mode.
    pub fn run(&self, plan: &ExecutionPlan) -> EngineResult<RunOutcome> {
        self.run_with_policy(plan, self.policy.for_mode(plan.mode))
    }

    /// Run `plan` under an explicit error policy.
    ///
    /// # Errors
    ///
    /// Returns `Err` only when no run could be started: an empty plan, or
    /// execute mode on a runner without a live backend. Every failure after
    /// the run starts is recorded in the trace and reported through
    /// `RunOutcome::success`.
    pub fn run_with_policy(
        &self,
        plan: &ExecutionPlan,
        policy: ErrorPolicy,
    ) -> EngineResult<RunOutcome> {
        if plan.is_empty() {
            return Err(EngineError::EmptyPlan);
        }

        let (ledger, chain): (&dyn Ledger, Option<&dyn ChainClient>) = match plan.mode {
            ExecutionMode::Simulate => (self.simulator.as_ref(), None),
            ExecutionMode::Execute => {
                let live = self.live.as_ref().ok_or_else(|| EngineError::ConfigError {
                    reason: "execute mode requires a chain client".to_string(),
                })?;
                (live.ledger.as_ref(), Some(live.chain.as_ref()))
            }
        };

        let (actions, anomalies) = if plan.is_graph() {
            let ordered = PlanBuilder::order(&plan.nodes, &plan.edges);
            let warnings = ordered.warnings(plan.edges.len());
            (ordered.actions, warnings)
        } else {
            (plan.actions.clone(), Vec::new())
        };

        let run_id = RunId::new();
        let wallet = self.wallet_for(plan);

        info!(
            run_id = %run_id,
            plan_id = plan.plan_id.as_deref().unwrap_or("-"),
            mode = %plan.mode,
            policy = ?policy,
            steps = actions.len(),
            "run starting"
        );

        self.state.create(run_id, plan.mode, &wallet);
        self.traces
            .create_trace(run_id, plan.plan_id.clone(), plan.mode, actions.len());

        for warning in &anomalies {
            warn!(run_id = %run_id, warning = %warning, "plan graph anomaly");
            self.traces.add_warning(&run_id, warning)?;
        }

        if let Some(chain) = chain {
            if let Err(e) = self.state.load_from_chain(&run_id, chain) {
                let reason = format!("failed to load wallet state from chain: {e}");
                warn!(run_id = %run_id, error = %e, "chain reconciliation failed; aborting run");
                self.traces.add_error(&run_id, &reason)?;
                let trace = self.traces.fail(&run_id, &reason)?;
                return Ok(Self::outcome(trace, false));
            }
        }

        let aborted = self.dispatch_all(&run_id, plan.mode, ledger, &actions, policy)?;

        let recorded = self
            .traces
            .get(&run_id)
            .ok_or_else(|| EngineError::UnknownRun { run_id: run_id.to_string() })?;
        let failed_steps = recorded.summary().failed_steps;
        let success = failed_steps == 0 && aborted.is_none();

        let trace = if success {
            self.traces.complete(&run_id)?
        } else {
            let reason = aborted.unwrap_or_else(|| {
                format!("{failed_steps} of {} step(s) failed", recorded.expected_steps)
            });
            self.traces.fail(&run_id, &reason)?
        };

        info!(
            run_id = %run_id,
            success,
            executed = trace.steps.len(),
            failed = failed_steps,
            "run finished"
        );

        Ok(Self::outcome(trace, success))
    }

    /// The sequential loop. Returns the abort reason when fail-fast stopped
    /// it early.
    fn dispatch_all(
        &self,
        run_id: &RunId,
        mode: ExecutionMode,
        ledger: &dyn Ledger,
        actions: &[ExecutionAction],
        policy: ErrorPolicy,
    ) -> EngineResult<Option<String>> {
        for (index, action) in actions.iter().enumerate() {
            let ctx = ActionContext {
                run_id,
                mode,
                step_index: index,
                state: self.state.as_ref(),
                ledger,
                decision: self.decision.as_deref(),
            };

            let result = self.registry.dispatch(&ctx, action);
            let failure = result.error.clone();
            self.traces
                .add_step(run_id, result, self.state.get(run_id))?;

            let Some(message) = failure else {
                continue;
            };

            self.traces.add_error(
                run_id,
                &format!("step {index} ({}): {message}", action.kind_name()),
            )?;

            if policy == ErrorPolicy::FailFast {
                let remaining = actions.len() - index - 1;
                warn!(
                    run_id = %run_id,
                    step = index,
                    skipped = remaining,
                    "fail-fast: stopping run at first failed step"
                );
                return Ok(Some(format!("execution stopped at step {index}: {message}")));
            }

            debug!(run_id = %run_id, step = index, "continuing after failed step");
        }
        Ok(None)
    }

    /// The plan may name its own wallet through `context.walletAddress`.
    fn wallet_for(&self, plan: &ExecutionPlan) -> String {
        plan.context
            .get("walletAddress")
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.wallet_address.clone())
    }

    fn outcome(trace: ExecutionTrace, success: bool) -> RunOutcome {
        let summary = trace.summary();
        RunOutcome {
            run_id: trace.run_id,
            success,
            trace,
            summary,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
