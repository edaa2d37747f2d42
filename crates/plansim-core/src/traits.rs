//! Trait seams of the plan engine.
//!
//! - `ChainClient`: live chain access (balances, transfers, calls)
//! - `DecisionClient`: the decision-query service used by `llm_agent`
//! - `StateStore`: per-run virtual ledger, keyed by `RunId`
//! - `TraceRecorder`: append-only per-run trace
//! - `Ledger`: settlement strategy, virtual (simulate) or live (execute)
//! - `ActionExecutor`: one handler per action kind
//!
//! The runner only talks to these traits. Concrete implementations live in
//! plansim-state, plansim-trace and plansim-actions; test doubles live next
//! to the tests that need them.

use chrono::Duration;
use rust_decimal::Decimal;
use serde_json::Value;

use plansim_contracts::{
    action::{ActionKind, ExecutionAction},
    client::{DecisionResponse, TxReceipt, TxRequest},
    error::EngineResult,
    plan::{ExecutionMode, RunId},
    result::{ActionResult, ActionStatus, GasInfo},
    state::{ContractEntry, VirtualState},
    trace::ExecutionTrace,
};

/// Live chain access.
///
/// Every method may fail with a network or RPC error; the engine surfaces
/// those as `error` step results and never retries.
pub trait ChainClient: Send + Sync {
    /// Native-token balance of `address`.
    fn get_balance(&self, address: &str) -> EngineResult<Decimal>;

    /// Transfer `amount` of `token` to `to`.
    fn send_payment(&self, to: &str, amount: Decimal, token: &str) -> EngineResult<TxReceipt>;

    /// Invoke `method` on the contract at `address`.
    fn call_contract(
        &self,
        address: &str,
        method: &str,
        args: &[Value],
        value: Option<Decimal>,
    ) -> EngineResult<TxReceipt>;

    /// Gas units the transaction would consume.
    fn estimate_gas(&self, tx: &TxRequest) -> EngineResult<u64>;
}

/// The decision-query collaborator.
///
/// Failure here is never fatal to a step: the `llm_agent` executor falls
/// back to a deterministic heuristic.
pub trait DecisionClient: Send + Sync {
    fn query(&self, prompt: &str, context: &Value) -> EngineResult<DecisionResponse>;
}

/// Per-run virtual ledger.
///
/// Runs are isolated by `RunId`. No operation panics or errors on an unknown
/// run: mutators report `false`, readers report `None`. `deduct` is the only
/// operation whose failure callers must check.
pub trait StateStore: Send + Sync {
    /// Initialize state for a run and return a snapshot of it.
    fn create(&self, run_id: RunId, mode: ExecutionMode, wallet_address: &str) -> VirtualState;

    /// Snapshot of a run's state.
    fn get(&self, run_id: &RunId) -> Option<VirtualState>;

    /// Overwrite a balance. Rejects negative amounts.
    fn set_balance(&self, run_id: &RunId, token: &str, amount: Decimal) -> bool;

    /// Subtract `amount`. Returns `false` and leaves the balance untouched
    /// when funds are insufficient.
    fn deduct(&self, run_id: &RunId, token: &str, amount: Decimal) -> bool;

    /// Add `amount`.
    fn credit(&self, run_id: &RunId, token: &str, amount: Decimal) -> bool;

    /// Overwrite the native balance with the chain's view and return it.
    ///
    /// Only meaningful for execute-mode runs; this is the single point where
    /// live and virtual state reconcile.
    fn load_from_chain(&self, run_id: &RunId, chain: &dyn ChainClient) -> EngineResult<Decimal>;

    /// Drop runs created more than `max_age` ago. Returns how many went.
    fn evict_older_than(&self, max_age: Duration) -> usize;

    /// The token balances default to when an action names none.
    fn native_token(&self) -> &str;
}

/// Append-only trace per run.
///
/// Once `complete` or `fail` has been called for a run, every further
/// mutation returns `EngineError::TraceFinalized`.
pub trait TraceRecorder: Send + Sync {
    /// Open a trace in `Running` and return a snapshot of it.
    fn create_trace(
        &self,
        run_id: RunId,
        plan_id: Option<String>,
        mode: ExecutionMode,
        expected_steps: usize,
    ) -> ExecutionTrace;

    /// Append a step and refresh the state snapshot.
    fn add_step(
        &self,
        run_id: &RunId,
        result: ActionResult,
        snapshot: Option<VirtualState>,
    ) -> EngineResult<()>;

    fn add_warning(&self, run_id: &RunId, message: &str) -> EngineResult<()>;

    fn add_error(&self, run_id: &RunId, message: &str) -> EngineResult<()>;

    /// Finalize as `Completed`.
    fn complete(&self, run_id: &RunId) -> EngineResult<ExecutionTrace>;

    /// Finalize as `Failed` with `reason`.
    fn fail(&self, run_id: &RunId, reason: &str) -> EngineResult<ExecutionTrace>;

    /// Snapshot of a trace.
    fn get(&self, run_id: &RunId) -> Option<ExecutionTrace>;
}

/// What a ledger reports after settling a value-moving or contract action.
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub status: ActionStatus,
    pub tx_hash: String,
    pub gas: GasInfo,
}

/// Settlement strategy shared by both modes.
///
/// `VirtualLedger` settles against the `StateStore` alone; `ChainLedger`
/// forwards to a `ChainClient` and reconciles the store afterwards. Executors
/// are written once against this trait.
pub trait Ledger: Send + Sync {
    fn mode(&self) -> ExecutionMode;

    /// Move `amount` of `token` out of the run's wallet to `to`.
    ///
    /// Must fail with `InsufficientFunds` and mutate nothing when the
    /// balance does not cover the amount.
    fn transfer(
        &self,
        ctx: &ActionContext<'_>,
        to: &str,
        amount: Decimal,
        token: &str,
    ) -> EngineResult<Settlement>;

    /// Invoke `method` on a deployed registry contract.
    fn call_contract(
        &self,
        ctx: &ActionContext<'_>,
        contract: &ContractEntry,
        method: &str,
        args: &[Value],
        value: Option<Decimal>,
    ) -> EngineResult<Settlement>;

    /// Grant `spender` an allowance of `amount` over `token`.
    fn approve(
        &self,
        ctx: &ActionContext<'_>,
        token: &str,
        spender: &str,
        amount: Decimal,
    ) -> EngineResult<Settlement>;
}

/// Everything an executor may touch while handling one step.
pub struct ActionContext<'a> {
    pub run_id: &'a RunId,
    pub mode: ExecutionMode,
    /// Zero-based position of the step in the ordered plan.
    pub step_index: usize,
    pub state: &'a dyn StateStore,
    pub ledger: &'a dyn Ledger,
    pub decision: Option<&'a dyn DecisionClient>,
}

impl ActionContext<'_> {
    /// The run's state, or `UnknownRun` when it was never created or was
    /// evicted.
    pub fn snapshot(&self) -> EngineResult<VirtualState> {
        self.state
            .get(self.run_id)
            .ok_or_else(|| plansim_contracts::error::EngineError::UnknownRun {
                run_id: self.run_id.to_string(),
            })
    }
}

/// Handler for one action kind.
///
/// Returning `Err` is the normal way to fail a step: the registry turns the
/// error's display text into the `error` result message.
pub trait ActionExecutor: Send + Sync {
    fn kind(&self) -> ActionKind;

    fn execute(&self, ctx: &ActionContext<'_>, action: &ExecutionAction) -> EngineResult<ActionResult>;
}
