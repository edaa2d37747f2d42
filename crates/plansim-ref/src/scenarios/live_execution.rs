//! Scenario 2: Live execution with fail-fast
//!
//! Execute mode against an in-process mock chain. The same action vocabulary
//! runs, but effects land on the chain and the runner stops at the first
//! failed step.
//!
//! Walk-through:
//!   1. Run start reconciles the wallet with the chain (5 TCRO)
//!   2. read_balance sees the chain balance
//!   3. x402_payment of 1 TCRO is mined; the wallet is re-read (4 TCRO)
//!   4. contract_call to an unregistered contract fails, the run stops, and
//!      the trailing read_balance is never dispatched
//!   5. A node that never confirms leaves the payment `pending`
//!   6. An unreachable node fails the run before any step

use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::json;

use plansim_config::EngineConfig;
use plansim_contracts::{
    error::EngineResult,
    plan::{ExecutionMode, ExecutionPlan},
};

use super::{actions, print_outcome};
use crate::{
    mock_chain::{ChainBehavior, MockChainClient},
    service::PlanService,
};

pub const MERCHANT: &str = "0x00000000000000000000000000000000000000b2";

/// Pay the merchant, then hit a contract that does not exist.
pub fn pay_then_call_unknown() -> EngineResult<ExecutionPlan> {
    let steps = actions(vec![
        json!({ "type": "read_balance", "token": "TCRO" }),
        json!({ "type": "x402_payment", "to": MERCHANT, "amount": "1", "token": "TCRO" }),
        json!({ "type": "contract_call", "contract": "ghost-vault", "method": "deposit" }),
        json!({ "type": "read_balance", "token": "TCRO" }),
    ])?;
    Ok(ExecutionPlan::new(ExecutionMode::Execute, steps).with_plan_id("pay-then-call"))
}

/// A single payment followed by a router call with attached value.
pub fn pay_and_route() -> EngineResult<ExecutionPlan> {
    let steps = actions(vec![
        json!({ "type": "x402_payment", "to": MERCHANT, "amount": "0.25", "token": "TCRO" }),
        json!({
            "type": "contract_call",
            "contract": "vvs-router",
            "method": "swapExactETHForTokens",
            "args": [0, ["TCRO", "USDC"]],
            "value": "0.5"
        }),
    ])?;
    Ok(ExecutionPlan::new(ExecutionMode::Execute, steps).with_plan_id("pay-and-route"))
}

/// A service whose execute mode talks to `chain`.
pub fn live_service(chain: Arc<MockChainClient>) -> EngineResult<PlanService> {
    Ok(PlanService::new(EngineConfig::embedded()?)?.with_chain(chain))
}

pub fn run_scenario() -> EngineResult<()> {
    println!("=== Scenario 2: Live Execution with Fail-Fast ===");
    println!();

    let chain = Arc::new(MockChainClient::new("TCRO", Decimal::from(5)));
    let service = live_service(chain.clone())?;

    println!("  Test: pay 1 TCRO, then call an unregistered contract");
    println!("  Chain balance before: {} TCRO", chain.balance());
    let outcome = service.run(&pay_then_call_unknown()?, ExecutionMode::Execute)?;
    print_outcome(&outcome);
    println!("  Chain balance after:  {} TCRO", chain.balance());
    if let Some(reason) = &outcome.trace.failure_reason {
        println!("  Stop reason: {reason}");
    }
    println!();

    println!("  Test: same payment on a node that never confirms");
    let stalled = Arc::new(
        MockChainClient::new("TCRO", Decimal::from(5)).with_behavior(ChainBehavior::Unconfirmed),
    );
    let outcome = live_service(stalled)?.run(&pay_and_route()?, ExecutionMode::Execute)?;
    print_outcome(&outcome);
    println!();

    println!("  Test: node unreachable at run start");
    let offline = Arc::new(
        MockChainClient::new("TCRO", Decimal::from(5)).with_behavior(ChainBehavior::Unreachable),
    );
    let outcome = live_service(offline)?.run(&pay_and_route()?, ExecutionMode::Execute)?;
    print_outcome(&outcome);
    for error in &outcome.trace.errors {
        println!("  error: {error}");
    }
    println!();

    println!("  Scenario 2 complete.");
    println!();
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use plansim_contracts::{result::ActionStatus, trace::TraceStatus};

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn chain(behavior: ChainBehavior) -> Arc<MockChainClient> {
        Arc::new(MockChainClient::new("TCRO", dec("5")).with_behavior(behavior))
    }

    #[test]
    fn test_fail_fast_stops_after_first_failure() {
        let node = chain(ChainBehavior::Confirming);
        let service = live_service(node.clone()).unwrap();
        let outcome = service
            .run(&pay_then_call_unknown().unwrap(), ExecutionMode::Execute)
            .unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.trace.status, TraceStatus::Failed);
        assert_eq!(outcome.trace.steps.len(), 3);
        assert_eq!(outcome.summary.total_steps, 4);
        assert_eq!(outcome.summary.executed_steps, 3);
        assert_eq!(outcome.trace.steps[0].result.as_ref().unwrap()["balance"], json!("5"));
        assert_eq!(outcome.trace.steps[1].status, ActionStatus::Success);
        assert_eq!(outcome.trace.steps[2].status, ActionStatus::Error);
        assert!(outcome
            .trace
            .failure_reason
            .as_deref()
            .unwrap()
            .contains("ghost-vault not found or not deployed"));

        assert_eq!(node.balance(), dec("4"));
        let state = service.get_run(&outcome.run_id).unwrap().state.unwrap();
        assert_eq!(state.balance("TCRO"), dec("4"));
    }

    #[test]
    fn test_contract_gas_falls_back_to_estimate() {
        let node = chain(ChainBehavior::Confirming);
        let outcome = live_service(node.clone())
            .unwrap()
            .run(&pay_and_route().unwrap(), ExecutionMode::Execute)
            .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.trace.steps[0].gas.as_ref().unwrap().gas_used, 21_000);
        assert_eq!(outcome.trace.steps[1].gas.as_ref().unwrap().gas_used, 120_000);
        assert_eq!(outcome.summary.total_gas_used, 141_000);
        assert_eq!(node.balance(), dec("4.25"));
        assert_eq!(node.submitted().len(), 2);
    }

    #[test]
    fn test_unconfirmed_receipts_are_pending() {
        let outcome = live_service(chain(ChainBehavior::Unconfirmed))
            .unwrap()
            .run(&pay_and_route().unwrap(), ExecutionMode::Execute)
            .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.summary.pending_steps, 2);
        assert!(outcome
            .trace
            .steps
            .iter()
            .all(|s| s.status == ActionStatus::Pending));
    }

    #[test]
    fn test_unreachable_chain_fails_before_any_step() {
        let outcome = live_service(chain(ChainBehavior::Unreachable))
            .unwrap()
            .run(&pay_and_route().unwrap(), ExecutionMode::Execute)
            .unwrap();

        assert!(!outcome.success);
        assert!(outcome.trace.steps.is_empty());
        assert!(outcome.trace.errors[0].contains("connection refused"));
    }

    #[test]
    fn test_reverted_call_is_an_error_step() {
        let outcome = live_service(chain(ChainBehavior::RevertingContracts))
            .unwrap()
            .run(&pay_and_route().unwrap(), ExecutionMode::Execute)
            .unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.trace.steps.len(), 2);
        assert!(outcome.trace.steps[1]
            .error
            .as_deref()
            .unwrap()
            .contains("execution reverted: swapExactETHForTokens"));
    }

    #[test]
    fn test_scenario_runs() {
        assert!(run_scenario().is_ok());
    }
}
