//! Scenario 3: Agent decision with fallback
//!
//! An `llm_agent` step asks the decision service whether to spend, followed
//! by a balance guard. The step succeeds whether or not the service answers.
//!
//! Walk-through:
//!   1. Decision service online → its answer is recorded, `fallback: false`
//!   2. Decision service times out → heuristic answer, `fallback: true`,
//!      recommends min(balance * 0.1, 1) = 1 TCRO from a 10 TCRO wallet
//!   3. Decision feature switched off in config → same heuristic path
//!   4. Wallet holding 0.05 TCRO → heuristic declines to execute

use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::json;

use plansim_config::EngineConfig;
use plansim_contracts::{
    error::EngineResult,
    plan::{ExecutionMode, ExecutionPlan},
    trace::RunOutcome,
};

use super::{actions, print_outcome};
use crate::{
    mock_decision::{DecisionMode, MockDecisionClient},
    service::PlanService,
};

pub fn ask_then_guard() -> EngineResult<ExecutionPlan> {
    let steps = actions(vec![
        json!({
            "type": "llm_agent",
            "prompt": "Should the agent settle the pending 0.5 TCRO invoice?",
            "model": "planner-small",
            "context": { "invoice": "2231" }
        }),
        json!({ "type": "condition", "expression": "balance > 1", "variable": "balance" }),
    ])?;
    Ok(ExecutionPlan::new(ExecutionMode::Simulate, steps).with_plan_id("ask-then-guard"))
}

/// Simulate `ask_then_guard` under `config`, optionally with a decision
/// client attached.
pub fn simulate_with(
    config: EngineConfig,
    decision: Option<Arc<MockDecisionClient>>,
) -> EngineResult<RunOutcome> {
    let mut service = PlanService::new(config)?;
    if let Some(client) = decision {
        service = service.with_decision(client);
    }
    service.run(&ask_then_guard()?, ExecutionMode::Simulate)
}

pub fn run_scenario() -> EngineResult<()> {
    println!("=== Scenario 3: Agent Decision with Fallback ===");
    println!();

    println!("  Test: decision service online");
    let online = Arc::new(MockDecisionClient::new(DecisionMode::Approving));
    let outcome = simulate_with(EngineConfig::embedded()?, Some(online.clone()))?;
    print_outcome(&outcome);
    println!("  Prompts sent: {}", online.prompts().len());
    println!();

    println!("  Test: decision service times out");
    let offline = Arc::new(MockDecisionClient::new(DecisionMode::Offline));
    let outcome = simulate_with(EngineConfig::embedded()?, Some(offline))?;
    print_outcome(&outcome);
    println!();

    println!("  Test: decision feature disabled");
    let mut config = EngineConfig::embedded()?;
    config.features.decision = false;
    let outcome = simulate_with(config, Some(online))?;
    print_outcome(&outcome);
    println!();

    println!("  Test: nearly empty wallet (0.05 TCRO)");
    let mut config = EngineConfig::embedded()?;
    config.seeds.simulate.insert("TCRO".to_string(), Decimal::new(5, 2));
    let outcome = simulate_with(config, None)?;
    print_outcome(&outcome);
    println!();

    println!("  Scenario 3 complete.");
    println!();
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
