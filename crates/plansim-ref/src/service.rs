//! `PlanService`: the operations a transport layer would expose.
//!
//! One service owns one runner, one state store and one trace recorder. It
//! forces the requested mode onto each submitted plan, wraps answers in the
//! `{success, data, error, timestamp}` envelope and exposes the read side
//! (stored runs, health) plus the retention janitor.
//!
//! `success` on the envelope says the request was handled. Whether the run
//! itself went well is `data.success`.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use plansim_actions::{standard_registry, ChainLedger, VirtualLedger};
use plansim_config::EngineConfig;
use plansim_contracts::{
    action::ActionKind,
    error::{EngineError, EngineResult},
    plan::{ExecutionMode, ExecutionPlan, RunId},
    state::VirtualState,
    trace::{ExecutionTrace, RunOutcome, RunSummary},
    validate::ValidationReport,
};
use plansim_core::{
    runner::{LiveBackend, Runner},
    traits::{ChainClient, DecisionClient, StateStore},
};
use plansim_state::VirtualStateStore;
use plansim_trace::{InMemoryTraceRecorder, TraceReader, TraceSummary};
use plansim_verify::PlanValidator;

// ── Response types ────────────────────────────────────────────────────────────

/// Envelope every mutating operation answers with.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn failure(error: &EngineError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
            timestamp: Utc::now(),
        }
    }

    fn from_result(result: EngineResult<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::failure(&e),
        }
    }
}

/// A stored run: its trace, the state it left behind and its tallies.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub run_id: RunId,
    pub trace: ExecutionTrace,
    /// Absent once the state entry has been evicted.
    pub state: Option<VirtualState>,
    pub summary: RunSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureReport {
    pub simulate: bool,
    pub execute: bool,
    pub decision_client: bool,
    pub graph_plans: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: &'static str,
    pub features: FeatureReport,
    pub supported_actions: Vec<ActionKind>,
    pub active_runs: usize,
    pub stored_runs: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvictionReport {
    pub states: usize,
    pub traces: usize,
}

// ── Service ───────────────────────────────────────────────────────────────────

pub struct PlanService {
    config: EngineConfig,
    runner: Runner,
    state: Arc<VirtualStateStore>,
    recorder: Arc<InMemoryTraceRecorder>,
    reader: TraceReader,
    validator: PlanValidator,
}

impl PlanService {
    /// A simulate-only service. Add `with_chain` to accept execute mode.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;

        let registry = standard_registry(&config)?;
        let validator = PlanValidator::with_supported(registry.kinds())?;
        let state = Arc::new(VirtualStateStore::from_config(&config));
        let recorder = Arc::new(InMemoryTraceRecorder::new());
        let reader = recorder.reader();

        let runner = Runner::new(
            registry,
            state.clone(),
            recorder.clone(),
            Arc::new(VirtualLedger::new(config.gas.clone())),
            config.wallet.address.clone(),
        )
        .with_policy(config.run_policy());

        info!(
            wallet = %config.wallet.address,
            native_token = %config.wallet.native_token,
            "plan service ready"
        );

        Ok(Self {
            config,
            runner,
            state,
            recorder,
            reader,
            validator,
        })
    }

    /// Attach a live chain. Ignored when execute mode is switched off.
    pub fn with_chain(mut self, chain: Arc<dyn ChainClient>) -> Self {
        if !self.config.features.execute {
            warn!("execute mode is disabled; chain client not attached");
            return self;
        }
        self.runner = self.runner.with_live(LiveBackend {
            ledger: Arc::new(ChainLedger::new(chain.clone(), self.config.gas.clone())),
            chain,
        });
        self
    }

    /// Attach a decision client. Ignored when the feature is switched off,
    /// which leaves `llm_agent` on its fallback path.
    pub fn with_decision(mut self, decision: Arc<dyn DecisionClient>) -> Self {
        if !self.config.features.decision {
            warn!("decision client disabled; llm_agent will use the fallback heuristic");
            return self;
        }
        self.runner = self.runner.with_decision(decision);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run `plan` in `mode`, whatever mode the plan itself declares.
    pub fn run(&self, plan: &ExecutionPlan, mode: ExecutionMode) -> EngineResult<RunOutcome> {
        if mode == ExecutionMode::Execute && !self.config.features.execute {
            return Err(EngineError::ConfigError {
                reason: "execute mode is disabled".to_string(),
            });
        }
        if plan.mode == mode {
            return self.runner.run(plan);
        }
        let mut forced = plan.clone();
        forced.mode = mode;
        self.runner.run(&forced)
    }

    pub fn simulate(&self, plan: &ExecutionPlan) -> ApiResponse<RunOutcome> {
        ApiResponse::from_result(self.run(plan, ExecutionMode::Simulate))
    }

    pub fn execute(&self, plan: &ExecutionPlan) -> ApiResponse<RunOutcome> {
        ApiResponse::from_result(self.run(plan, ExecutionMode::Execute))
    }

    /// Parse a JSON plan document and run it in `mode`.
    ///
    /// The document's own `mode` may be omitted. Malformed steps are not
    /// rejected here; they surface as `error` steps in the trace.
    pub fn submit(&self, document: &Value, mode: ExecutionMode) -> ApiResponse<RunOutcome> {
        ApiResponse::from_result(Self::parse_plan(document, mode).and_then(|plan| self.run(&plan, mode)))
    }

    fn parse_plan(document: &Value, mode: ExecutionMode) -> EngineResult<ExecutionPlan> {
        let mut document = document.clone();
        if let Value::Object(fields) = &mut document {
            fields
                .entry("mode")
                .or_insert_with(|| Value::String(mode.as_str().to_string()));
        }
        serde_json::from_value(document).map_err(|e| EngineError::InvalidPlan {
            reason: e.to_string(),
        })
    }

    /// Check a plan document without running it.
    pub fn validate(&self, document: &Value) -> ValidationReport {
        self.validator.validate_json(document)
    }

    pub fn get_run(&self, run_id: &RunId) -> Option<RunRecord> {
        let trace = self.reader.get(run_id)?;
        let summary = trace.summary();
        Some(RunRecord {
            run_id: *run_id,
            state: self.state.get(run_id),
            summary,
            trace,
        })
    }

    /// Stored runs, oldest first.
    pub fn list_runs(&self) -> Vec<TraceSummary> {
        self.reader.list()
    }

    pub fn health(&self) -> HealthReport {
        HealthReport {
            status: "ok",
            features: FeatureReport {
                simulate: true,
                execute: self.runner.supports_live(),
                decision_client: self.runner.has_decision_client(),
                graph_plans: true,
            },
            supported_actions: self.runner.registry().kinds(),
            active_runs: self.reader.active_count(),
            stored_runs: self.reader.len(),
            timestamp: Utc::now(),
        }
    }

    /// Drop runs older than the configured retention window.
    pub fn evict_expired(&self) -> EvictionReport {
        self.evict_older_than(self.config.retention())
    }

    pub fn evict_older_than(&self, max_age: Duration) -> EvictionReport {
        let report = EvictionReport {
            states: self.state.evict_older_than(max_age),
            traces: self.recorder.evict_older_than(max_age),
        };
        if report.states + report.traces > 0 {
            info!(states = report.states, traces = report.traces, "expired runs evicted");
        }
        report
    }
}
