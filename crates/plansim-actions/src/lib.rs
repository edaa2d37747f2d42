//! # plansim-actions
//!
//! One executor per action kind, plus the two settlement strategies.
//!
//! ## Overview
//!
//! Executors are written once against [`Ledger`](plansim_core::traits::Ledger):
//!
//! - [`VirtualLedger`] settles against the run's virtual state (simulate)
//! - [`ChainLedger`] forwards to a live chain client (execute)
//!
//! so `x402_payment`, `contract_call` and `approve_token` behave the same in
//! both modes apart from where the effect lands and which status comes back.
//!
//! [`standard_registry`] registers every shipped executor. `swap` is
//! reserved and deliberately left out, so dispatching it fails with
//! `Unsupported action type: swap`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use plansim_actions::{standard_registry, VirtualLedger};
//!
//! let registry = standard_registry(&config)?;
//! let simulator = Arc::new(VirtualLedger::new(config.gas.clone()));
//! let runner = Runner::new(registry, state, traces, simulator, &config.wallet.address);
//! ```

pub mod agent;
pub mod chain_ledger;
pub mod condition;
pub mod contract;
pub mod hash;
pub mod payment;
pub mod read;
mod support;
pub mod virtual_ledger;

pub use agent::{FallbackDecision, LlmAgentExecutor};
pub use chain_ledger::ChainLedger;
pub use condition::{ConditionExecutor, Evaluation};
pub use contract::{ApproveTokenExecutor, ContractCallExecutor};
pub use hash::simulated_tx_hash;
pub use payment::X402PaymentExecutor;
pub use read::{ReadBalanceExecutor, ReadStateExecutor};
pub use virtual_ledger::VirtualLedger;

use plansim_config::EngineConfig;
use plansim_contracts::error::EngineResult;
use plansim_core::registry::ExecutorRegistry;

/// Every shipped executor, tuned from `config`.
pub fn standard_registry(config: &EngineConfig) -> EngineResult<ExecutorRegistry> {
    Ok(ExecutorRegistry::new()
        .with(Box::new(ReadBalanceExecutor))
        .with(Box::new(X402PaymentExecutor))
        .with(Box::new(ContractCallExecutor))
        .with(Box::new(ReadStateExecutor))
        .with(Box::new(ApproveTokenExecutor))
        .with(Box::new(ConditionExecutor::new()?))
        .with(Box::new(LlmAgentExecutor::new(config.decision.clone()))))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::{Arc, Mutex};

    use rust_decimal::Decimal;
    use serde_json::{json, Value};

    use plansim_config::EngineConfig;
    use plansim_contracts::{
        action::{ActionKind, ExecutionAction},
        client::{DecisionResponse, TxReceipt, TxRequest},
        error::{EngineError, EngineResult},
        plan::{ExecutionMode, ExecutionPlan, RunId},
        result::ActionStatus,
        trace::{RunOutcome, TraceStatus},
    };
    use plansim_core::{
        runner::{LiveBackend, Runner},
        traits::{ChainClient, DecisionClient},
    };
    use plansim_state::VirtualStateStore;
    use plansim_trace::InMemoryTraceRecorder;

    use super::*;

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn action(value: Value) -> ExecutionAction {
        serde_json::from_value(value).unwrap()
    }

    fn simulator(config: &EngineConfig) -> Runner {
        Runner::new(
            standard_registry(config).unwrap(),
            Arc::new(VirtualStateStore::from_config(config)),
            Arc::new(InMemoryTraceRecorder::new()),
            Arc::new(VirtualLedger::new(config.gas.clone())),
            config.wallet.address.clone(),
        )
    }

    fn simulate(actions: Vec<Value>) -> RunOutcome {
        let plan = ExecutionPlan::new(
            ExecutionMode::Simulate,
            actions.into_iter().map(action).collect(),
        );
        simulator(&EngineConfig::default()).run(&plan).unwrap()
    }

    /// A chain that keeps one native balance and records every call.
    struct MockChain {
        balance: Mutex<Decimal>,
        confirm: bool,
        fail_sends: bool,
        receipt_gas: u64,
        receipt_price: Option<Decimal>,
        calls: Mutex<Vec<String>>,
    }

    impl MockChain {
        fn new(balance: &str) -> Self {
            Self {
                balance: Mutex::new(dec(balance)),
                confirm: true,
                fail_sends: false,
                receipt_gas: 21_000,
                receipt_price: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn receipt(&self) -> TxReceipt {
            TxReceipt {
                tx_hash: "0xfeed".to_string(),
                gas_used: self.receipt_gas,
                gas_price_gwei: self.receipt_price,
                block_number: Some(7),
                confirmed: self.confirm,
            }
        }
    }

    impl ChainClient for MockChain {
        fn get_balance(&self, _address: &str) -> EngineResult<Decimal> {
            self.calls.lock().unwrap().push("balance".to_string());
            Ok(*self.balance.lock().unwrap())
        }

        fn send_payment(&self, to: &str, amount: Decimal, token: &str) -> EngineResult<TxReceipt> {
            if self.fail_sends {
                return Err(EngineError::Chain {
                    reason: "nonce too low".to_string(),
                });
            }
            self.calls
                .lock()
                .unwrap()
                .push(format!("send:{to}:{amount}:{token}"));
            if self.confirm && token == "TCRO" {
                *self.balance.lock().unwrap() -= amount;
            }
            Ok(self.receipt())
        }

        fn call_contract(
            &self,
            address: &str,
            method: &str,
            _args: &[Value],
            _value: Option<Decimal>,
        ) -> EngineResult<TxReceipt> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("call:{address}:{method}"));
            Ok(self.receipt())
        }

        fn estimate_gas(&self, _tx: &TxRequest) -> EngineResult<u64> {
            Ok(33_000)
        }
    }

    fn executor(chain: Arc<MockChain>) -> Runner {
        let config = EngineConfig::default();
        simulator(&config).with_live(LiveBackend {
            ledger: Arc::new(ChainLedger::new(chain.clone(), config.gas.clone())),
            chain,
        })
    }

    fn execute(chain: Arc<MockChain>, actions: Vec<Value>) -> RunOutcome {
        let plan = ExecutionPlan::new(
            ExecutionMode::Execute,
            actions.into_iter().map(action).collect(),
        );
        executor(chain).run(&plan).unwrap()
    }

    struct Decider(Result<&'static str, &'static str>);

    impl DecisionClient for Decider {
        fn query(&self, _prompt: &str, context: &Value) -> EngineResult<DecisionResponse> {
            assert!(context["balances"]["TCRO"].is_string());
            match self.0 {
                Ok(text) => Ok(DecisionResponse {
                    response: text.to_string(),
                    execution_time_ms: 12,
                }),
                Err(reason) => Err(EngineError::Decision {
                    reason: reason.to_string(),
                }),
            }
        }
    }

    // ── 1. registry ───────────────────────────────────────────────────────────

    #[test]
    fn test_standard_registry_covers_all_but_swap() {
        let registry = standard_registry(&EngineConfig::default()).unwrap();
        for kind in ActionKind::ALL {
            assert_eq!(registry.supports(kind), kind != ActionKind::Swap, "{kind}");
        }
    }

    // ── 2. reads and payments ─────────────────────────────────────────────────

    /// read_balance then a payment that fits the seeded balance.
    #[test]
    fn test_read_then_pay() {
        let outcome = simulate(vec![
            json!({ "type": "read_balance", "token": "TCRO" }),
            json!({ "type": "x402_payment", "to": "0xA", "amount": "0.5", "token": "TCRO" }),
        ]);

        assert!(outcome.success);
        let steps = &outcome.trace.steps;
        assert_eq!(steps[0].status, ActionStatus::Success);
        assert_eq!(steps[0].result.as_ref().unwrap()["balance"], "10");
        assert_eq!(steps[1].status, ActionStatus::Simulated);
        assert_eq!(steps[1].result.as_ref().unwrap()["newBalance"], "9.5");

        let tx_hash = steps[1].tx_hash.as_deref().unwrap();
        assert!(tx_hash.starts_with("0x"));
        assert_eq!(tx_hash.len(), 66);
        assert_eq!(steps[1].gas.as_ref().unwrap().gas_used, 21_000);
        assert_eq!(outcome.summary.total_gas_used, 21_000);
        assert_eq!(outcome.trace.status, TraceStatus::Completed);
    }

    /// An overdraft fails the step and leaves the balance alone.
    #[test]
    fn test_payment_over_balance_is_rejected() {
        let outcome = simulate(vec![
            json!({ "type": "read_balance", "token": "TCRO" }),
            json!({ "type": "x402_payment", "to": "0xA", "amount": 15, "token": "TCRO" }),
        ]);

        assert!(!outcome.success);
        let failed = &outcome.trace.steps[1];
        assert_eq!(failed.status, ActionStatus::Error);
        assert!(failed.error.as_deref().unwrap().to_lowercase().contains("insufficient"));
        assert!(failed.tx_hash.is_none());

        let snapshot = outcome.trace.state_snapshot.as_ref().unwrap();
        assert_eq!(snapshot.balance("TCRO"), dec("10"));
    }

    #[test]
    fn test_payment_defaults_to_native_token_and_keeps_memo() {
        let outcome = simulate(vec![json!({
            "type": "x402_payment", "to": "0xB", "amount": "1.25", "memo": "invoice-42"
        })]);

        let payload = outcome.trace.steps[0].result.clone().unwrap();
        assert_eq!(payload["token"], "TCRO");
        assert_eq!(payload["newBalance"], "8.75");
        assert_eq!(payload["memo"], "invoice-42");
    }

    #[test]
    fn test_non_native_payment_is_priced_as_token_transfer() {
        let outcome = simulate(vec![json!({
            "type": "x402_payment", "to": "0xB", "amount": "40", "token": "USDC"
        })]);

        let step = &outcome.trace.steps[0];
        assert_eq!(step.result.as_ref().unwrap()["newBalance"], "60");
        assert_eq!(step.gas.as_ref().unwrap().gas_used, 65_000);
    }

    #[test]
    fn test_payment_missing_recipient() {
        let outcome = simulate(vec![json!({ "type": "x402_payment", "amount": "1" })]);
        assert_eq!(
            outcome.trace.steps[0].error.as_deref(),
            Some("x402_payment action requires 'to'")
        );
    }

    // ── 3. contracts ──────────────────────────────────────────────────────────

    #[test]
    fn test_contract_call_unknown_contract() {
        let outcome = simulate(vec![json!({
            "type": "contract_call", "contract": "ghost-contract", "method": "execute"
        })]);

        assert_eq!(outcome.trace.steps[0].status, ActionStatus::Error);
        assert_eq!(
            outcome.trace.steps[0].error.as_deref(),
            Some("ghost-contract not found or not deployed")
        );
    }

    #[test]
    fn test_contract_call_gas_is_banded_by_method() {
        let outcome = simulate(vec![
            json!({ "type": "contract_call", "contract": "x402-facilitator", "method": "executeSettlement" }),
            json!({ "type": "contract_call", "contract": "usdc-token", "method": "approve" }),
            json!({ "type": "contract_call", "contract": "usdc-token", "method": "balanceOf", "args": ["0xA"] }),
        ]);

        let gas: Vec<u64> = outcome
            .trace
            .steps
            .iter()
            .map(|s| s.gas.as_ref().unwrap().gas_used)
            .collect();
        assert_eq!(gas, vec![150_000, 46_000, 100_000]);
        assert!(outcome
            .trace
            .steps
            .iter()
            .all(|s| s.status == ActionStatus::Simulated));
    }

    #[test]
    fn test_contract_call_value_is_debited() {
        let outcome = simulate(vec![
            json!({ "type": "contract_call", "contract": "vvs-router", "method": "swapExactETH", "value": "2" }),
            json!({ "type": "contract_call", "contract": "vvs-router", "method": "swapExactETH", "value": "20" }),
        ]);

        assert_eq!(outcome.trace.steps[0].status, ActionStatus::Simulated);
        assert!(outcome.trace.steps[1].is_error());
        assert_eq!(
            outcome.trace.state_snapshot.as_ref().unwrap().balance("TCRO"),
            dec("8")
        );
    }

    #[test]
    fn test_read_state_returns_registry_entry() {
        let outcome = simulate(vec![
            json!({ "type": "read_state", "contract": "vvs-router" }),
            json!({ "type": "read_state", "contract": "nowhere" }),
        ]);

        let entry = outcome.trace.steps[0].result.clone().unwrap();
        assert_eq!(entry["deployed"], true);
        assert!(entry["address"].as_str().unwrap().starts_with("0x"));
        assert_eq!(
            outcome.trace.steps[1].error.as_deref(),
            Some("nowhere not found or not deployed")
        );
    }

    /// Approval is priced but no allowance is tracked.
    #[test]
    fn test_approve_token_in_simulation() {
        let outcome = simulate(vec![
            json!({ "type": "approve_token", "token": "USDC", "amount": "50", "contract": "vvs-router" }),
            json!({ "type": "approve_token", "token": "USDC", "amount": "50", "contract": "0xABCDEF" }),
            json!({ "type": "approve_token", "token": "USDC", "amount": "50", "contract": "mystery" }),
        ]);

        let first = &outcome.trace.steps[0];
        assert_eq!(first.status, ActionStatus::Simulated);
        assert_eq!(first.gas.as_ref().unwrap().gas_used, 46_000);
        assert_eq!(first.result.as_ref().unwrap()["allowanceTracked"], false);
        assert_eq!(outcome.trace.steps[1].status, ActionStatus::Simulated);

        let unresolved = &outcome.trace.steps[2];
        assert_eq!(unresolved.status, ActionStatus::Simulated);
        assert_eq!(unresolved.gas.as_ref().unwrap().gas_used, 46_000);
        assert_eq!(unresolved.result.as_ref().unwrap()["spenderAddress"], "mystery");
        assert!(outcome.success);

        let snapshot = outcome.trace.state_snapshot.as_ref().unwrap();
        assert_eq!(snapshot.balance("USDC"), dec("100"));
    }

    // ── 4. conditions and decisions ───────────────────────────────────────────

    #[test]
    fn test_condition_in_plan() {
        let outcome = simulate(vec![
            json!({ "type": "x402_payment", "to": "0xA", "amount": "6" }),
            json!({ "type": "condition", "expression": "balance > 5", "variable": "balance" }),
            json!({ "type": "condition", "expression": "balance ** 2" }),
        ]);

        assert!(outcome.success);
        let checked = outcome.trace.steps[1].result.clone().unwrap();
        assert_eq!(checked["result"], false);
        assert_eq!(checked["evaluated"], "4 > 5");

        let unsupported = outcome.trace.steps[2].result.clone().unwrap();
        assert_eq!(unsupported["supported"], false);
        assert_eq!(outcome.trace.steps[2].status, ActionStatus::Success);
    }

    /// No decision client at all takes the fallback path.
    #[test]
    fn test_llm_agent_without_client_falls_back() {
        let outcome = simulate(vec![json!({ "type": "llm_agent", "prompt": "pay the invoice?" })]);

        assert!(outcome.success);
        let payload = outcome.trace.steps[0].result.clone().unwrap();
        assert_eq!(payload["fallback"], true);
        assert_eq!(payload["decision"]["execute"], true);
        assert_eq!(payload["decision"]["recommendedAmount"], "1");
    }

    #[test]
    fn test_llm_agent_uses_client_when_it_answers() {
        let config = EngineConfig::default();
        let runner = simulator(&config).with_decision(Arc::new(Decider(Ok("proceed"))));
        let plan = ExecutionPlan::new(
            ExecutionMode::Simulate,
            vec![action(json!({ "type": "llm_agent", "prompt": "go?", "model": "m1" }))],
        );

        let outcome = runner.run(&plan).unwrap();

        let payload = outcome.trace.steps[0].result.clone().unwrap();
        assert_eq!(payload["response"], "proceed");
        assert_eq!(payload["fallback"], false);
        assert_eq!(payload["model"], "m1");
    }

    #[test]
    fn test_llm_agent_falls_back_on_client_failure() {
        let config = EngineConfig::default();
        let runner = simulator(&config).with_decision(Arc::new(Decider(Err("timeout"))));
        let plan = ExecutionPlan::new(
            ExecutionMode::Simulate,
            vec![action(json!({ "type": "llm_agent", "prompt": "go?" }))],
        );

        let outcome = runner.run(&plan).unwrap();

        assert_eq!(outcome.trace.steps[0].status, ActionStatus::Success);
        let payload = outcome.trace.steps[0].result.clone().unwrap();
        assert_eq!(payload["fallback"], true);
        assert!(payload["reason"].as_str().unwrap().contains("timeout"));
    }

    #[test]
    fn test_fallback_heuristic_bounds() {
        let agent = LlmAgentExecutor::new(EngineConfig::default().decision);

        let low = agent.fallback(dec("0.1"));
        assert!(!low.execute);
        assert_eq!(low.recommended_amount, Decimal::ZERO);

        assert_eq!(agent.fallback(dec("5")).recommended_amount, dec("0.5"));
        assert_eq!(agent.fallback(dec("500")).recommended_amount, dec("1"));
    }

    // ── 5. reserved and unknown kinds ─────────────────────────────────────────

    #[test]
    fn test_swap_and_unknown_kinds_are_unsupported() {
        let outcome = simulate(vec![
            json!({ "type": "swap", "fromToken": "TCRO", "toToken": "USDC", "amount": "1" }),
            json!({ "type": "bridge", "amount": "1" }),
        ]);

        assert_eq!(
            outcome.trace.steps[0].error.as_deref(),
            Some("Unsupported action type: swap")
        );
        assert_eq!(
            outcome.trace.steps[1].error.as_deref(),
            Some("Unsupported action type: bridge")
        );
        assert_eq!(outcome.summary.failed_steps, 2);
    }

    // ── 6. synthetic hashes ───────────────────────────────────────────────────

    #[test]
    fn test_simulated_tx_hash_is_deterministic() {
        let run_id = RunId::new();
        let a = simulated_tx_hash(&run_id, 1, "transfer:0xA:0.5:TCRO");
        assert_eq!(a, simulated_tx_hash(&run_id, 1, "transfer:0xA:0.5:TCRO"));
        assert_ne!(a, simulated_tx_hash(&run_id, 2, "transfer:0xA:0.5:TCRO"));
        assert_ne!(a, simulated_tx_hash(&RunId::new(), 1, "transfer:0xA:0.5:TCRO"));
    }

    // ── 7. live execution ─────────────────────────────────────────────────────

    /// A confirmed payment succeeds and the native balance is reloaded.
    #[test]
    fn test_live_payment_reconciles_balance() {
        let chain = Arc::new(MockChain::new("5"));
        let outcome = execute(
            chain.clone(),
            vec![json!({ "type": "x402_payment", "to": "0xA", "amount": "1.5", "token": "TCRO" })],
        );

        assert!(outcome.success);
        let step = &outcome.trace.steps[0];
        assert_eq!(step.status, ActionStatus::Success);
        assert_eq!(step.tx_hash.as_deref(), Some("0xfeed"));
        assert_eq!(step.result.as_ref().unwrap()["previousBalance"], "5");
        assert_eq!(step.result.as_ref().unwrap()["newBalance"], "3.5");

        let calls = chain.calls.lock().unwrap();
        assert_eq!(
            calls.as_slice(),
            ["balance", "send:0xA:1.5:TCRO", "balance"].map(String::from)
        );
    }

    #[test]
    fn test_live_unconfirmed_payment_is_pending() {
        let mut chain = MockChain::new("5");
        chain.confirm = false;
        chain.receipt_gas = 0;

        let outcome = execute(
            Arc::new(chain),
            vec![json!({ "type": "x402_payment", "to": "0xA", "amount": "1" })],
        );

        let step = &outcome.trace.steps[0];
        assert_eq!(step.status, ActionStatus::Pending);
        assert_eq!(step.gas.as_ref().unwrap().gas_used, 33_000);
        assert_eq!(outcome.summary.pending_steps, 1);
        assert!(outcome.success);
    }

    /// A chain error fails the step and stops the run.
    #[test]
    fn test_live_chain_error_stops_run() {
        let mut chain = MockChain::new("5");
        chain.fail_sends = true;

        let outcome = execute(
            Arc::new(chain),
            vec![
                json!({ "type": "x402_payment", "to": "0xA", "amount": "1" }),
                json!({ "type": "read_balance" }),
            ],
        );

        assert!(!outcome.success);
        assert_eq!(outcome.trace.steps.len(), 1);
        assert_eq!(
            outcome.trace.steps[0].error.as_deref(),
            Some("chain client error: nonce too low")
        );
        assert_eq!(outcome.trace.status, TraceStatus::Failed);
    }

    #[test]
    fn test_live_contract_call_and_approve_go_to_chain() {
        let chain = Arc::new(MockChain::new("5"));
        let outcome = execute(
            chain.clone(),
            vec![
                json!({ "type": "contract_call", "contract": "x402-facilitator", "method": "settle" }),
                json!({ "type": "approve_token", "token": "usdc-token", "amount": "10", "contract": "vvs-router" }),
            ],
        );

        assert!(outcome.success);
        assert!(outcome
            .trace
            .steps
            .iter()
            .all(|s| s.status == ActionStatus::Success));

        let calls = chain.calls.lock().unwrap();
        assert!(calls[1].starts_with("call:0x5e1f"));
        assert!(calls[1].ends_with(":settle"));
        assert!(calls[2].starts_with("call:0xc212"));
        assert!(calls[2].ends_with(":approve"));

        let approve = outcome.trace.steps[1].result.clone().unwrap();
        assert_eq!(approve["allowanceTracked"], true);
    }

    /// A live approval needs a token and spender the chain can address.
    #[test]
    fn test_live_approve_rejects_unresolved_names() {
        let chain = Arc::new(MockChain::new("5"));
        let outcome = execute(
            chain.clone(),
            vec![json!({ "type": "approve_token", "token": "USDC", "amount": "10", "contract": "vvs-router" })],
        );
        assert!(!outcome.success);
        assert_eq!(
            outcome.trace.steps[0].error.as_deref(),
            Some("USDC not found or not deployed")
        );

        let outcome = execute(
            chain.clone(),
            vec![json!({ "type": "approve_token", "token": "usdc-token", "amount": "10", "contract": "router" })],
        );
        assert_eq!(
            outcome.trace.steps[0].error.as_deref(),
            Some("router not found or not deployed")
        );

        let calls = chain.calls.lock().unwrap();
        assert!(calls.iter().all(|c| !c.ends_with(":approve")));
    }

    /// Gas figures too large to price fail the step instead of the process.
    #[test]
    fn test_live_receipt_with_unpriceable_gas_is_an_error_step() {
        let mut chain = MockChain::new("5");
        chain.receipt_gas = u64::MAX;
        chain.receipt_price = Some(Decimal::from(1_000_000_000_000u64));

        let outcome = execute(
            Arc::new(chain),
            vec![
                json!({ "type": "x402_payment", "to": "0xA", "amount": "1" }),
                json!({ "type": "read_balance" }),
            ],
        );

        assert!(!outcome.success);
        assert_eq!(outcome.trace.steps.len(), 1);
        let step = &outcome.trace.steps[0];
        assert_eq!(step.status, ActionStatus::Error);
        assert!(step
            .error
            .as_deref()
            .unwrap()
            .starts_with("chain client error: gas figures out of range"));
    }
}
