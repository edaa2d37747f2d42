//! Scenario 1: Simulated payment flow
//!
//! Runs the canonical read-then-pay plan against the virtual ledger, then
//! the ways it can go wrong.
//!
//! Walk-through:
//!   1. read_balance(TCRO) on a wallet seeded with 10 TCRO → "10"
//!   2. x402_payment of 0.5 TCRO → newBalance "9.5", status simulated
//!   3. The same plan paying 15 TCRO → "Insufficient ..." and no mutation
//!   4. A call to an unregistered contract and a swap → both rejected by
//!      name, the run keeps going because simulation never stops early

use rust_decimal::Decimal;
use serde_json::json;

use plansim_config::EngineConfig;
use plansim_contracts::{
    error::EngineResult,
    plan::{ExecutionMode, ExecutionPlan},
};

use super::{actions, print_outcome};
use crate::service::PlanService;

pub const PAYEE: &str = "0x00000000000000000000000000000000000000a1";

/// `[read_balance(TCRO), x402_payment(PAYEE, amount, TCRO)]`.
pub fn read_then_pay(amount: Decimal) -> EngineResult<ExecutionPlan> {
    let steps = actions(vec![
        json!({ "type": "read_balance", "token": "TCRO" }),
        json!({
            "type": "x402_payment",
            "to": PAYEE,
            "amount": amount.to_string(),
            "token": "TCRO",
            "memo": "invoice 2231"
        }),
    ])?;
    Ok(ExecutionPlan::new(ExecutionMode::Simulate, steps).with_plan_id("read-then-pay"))
}

/// A plan where every step but the first is rejected.
pub fn rejected_steps() -> EngineResult<ExecutionPlan> {
    let steps = actions(vec![
        json!({ "type": "read_balance" }),
        json!({ "type": "contract_call", "contract": "ghost-vault", "method": "deposit" }),
        json!({ "type": "swap", "fromToken": "TCRO", "toToken": "USDC", "amount": "1" }),
        json!({ "type": "x402_payment", "amount": "1" }),
    ])?;
    Ok(ExecutionPlan::new(ExecutionMode::Simulate, steps).with_plan_id("rejections"))
}

pub fn run_scenario() -> EngineResult<()> {
    println!("=== Scenario 1: Simulated Payment Flow ===");
    println!();

    let service = PlanService::new(EngineConfig::embedded()?)?;

    println!("  Test: read balance, then pay 0.5 TCRO");
    let outcome = service.run(&read_then_pay(Decimal::new(5, 1))?, ExecutionMode::Simulate)?;
    print_outcome(&outcome);
    println!();

    println!("  Test: same plan paying 15 TCRO (more than the wallet holds)");
    let outcome = service.run(&read_then_pay(Decimal::from(15))?, ExecutionMode::Simulate)?;
    print_outcome(&outcome);
    if let Some(state) = service.get_run(&outcome.run_id).and_then(|r| r.state) {
        println!("  Balance after rejection: {} TCRO", state.balance("TCRO"));
    }
    println!();

    println!("  Test: unknown contract, reserved swap, payment without a recipient");
    let outcome = service.run(&rejected_steps()?, ExecutionMode::Simulate)?;
    print_outcome(&outcome);
    println!();

    println!("  Runs recorded: {}", service.list_runs().len());
    println!("  Scenario 1 complete.");
    println!();
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;

    use plansim_contracts::{
        result::ActionStatus,
        trace::{RunOutcome, TraceStatus},
    };

    use super::*;

    fn simulate(plan: &ExecutionPlan) -> RunOutcome {
        PlanService::new(EngineConfig::embedded().unwrap())
            .unwrap()
            .run(plan, ExecutionMode::Simulate)
            .unwrap()
    }

    #[test]
    fn test_read_then_pay_moves_half_a_token() {
        let outcome = simulate(&read_then_pay(Decimal::new(5, 1)).unwrap());

        assert!(outcome.success);
        assert_eq!(outcome.trace.status, TraceStatus::Completed);
        assert_eq!(outcome.trace.steps[0].result.as_ref().unwrap()["balance"], json!("10"));

        let payment = &outcome.trace.steps[1];
        assert_eq!(payment.status, ActionStatus::Simulated);
        let payload = payment.result.as_ref().unwrap();
        assert_eq!(payload["previousBalance"], json!("10"));
        assert_eq!(payload["newBalance"], json!("9.5"));
        assert_eq!(payload["memo"], json!("invoice 2231"));
        assert!(payment.tx_hash.as_ref().unwrap().starts_with("0x"));
    }

    #[test]
    fn test_overdraft_is_rejected_without_mutation() {
        let service = PlanService::new(EngineConfig::embedded().unwrap()).unwrap();
        let outcome = service
            .run(&read_then_pay(Decimal::from(15)).unwrap(), ExecutionMode::Simulate)
            .unwrap();

        assert!(!outcome.success);
        let payment = &outcome.trace.steps[1];
        assert_eq!(payment.status, ActionStatus::Error);
        assert!(payment
            .error
            .as_ref()
            .unwrap()
            .to_lowercase()
            .contains("insufficient"));

        let state = service.get_run(&outcome.run_id).unwrap().state.unwrap();
        assert_eq!(state.balance("TCRO"), Decimal::from(10));
    }

    #[test]
    fn test_rejections_keep_every_step_in_simulation() {
        let outcome = simulate(&rejected_steps().unwrap());

        assert!(!outcome.success);
        assert_eq!(outcome.trace.steps.len(), 4);
        assert_eq!(outcome.summary.failed_steps, 3);

        let messages: Vec<&str> = outcome.trace.steps[1..]
            .iter()
            .map(|s| s.error.as_deref().unwrap())
            .collect();
        assert_eq!(messages[0], "ghost-vault not found or not deployed");
        assert_eq!(messages[1], "Unsupported action type: swap");
        assert!(messages[2].contains("'to'"));
    }

    #[test]
    fn test_scenario_runs() {
        assert!(run_scenario().is_ok());
    }
}
