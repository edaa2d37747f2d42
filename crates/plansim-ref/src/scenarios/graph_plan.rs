//! Scenario 4: Graph plans and validation
//!
//! Plans may arrive as a node/edge graph instead of an ordered list. The
//! runner orders them deterministically; malformed graphs still run, with
//! the anomalies reported as warnings.
//!
//! Walk-through:
//!   1. Validate a five-node USDC payment graph declared out of order
//!   2. Simulate it: quote and fund run first, then approve, pay, report
//!   3. Validate and simulate a graph with a two-node cycle: every node
//!      runs once, the cycle shows up as a warning
//!   4. Validate a malformed document: bad mode, missing fields, swap

use serde_json::{json, Value};

use plansim_config::EngineConfig;
use plansim_contracts::{
    action::ExecutionAction,
    error::{EngineError, EngineResult},
    plan::{ExecutionMode, ExecutionPlan, PlanEdge, PlanNode},
};

use super::print_outcome;
use crate::service::PlanService;

fn node(id: &str, action: Value) -> EngineResult<PlanNode> {
    Ok(PlanNode::new(id, ExecutionAction::from_json(action)?))
}

fn to_document(plan: &ExecutionPlan) -> EngineResult<Value> {
    serde_json::to_value(plan).map_err(|e| EngineError::InvalidPlan {
        reason: e.to_string(),
    })
}

/// Approve the router, pay in USDC and check what is left. Nodes are
/// declared in reverse so the order comes from the edges alone.
pub fn usdc_payment_graph() -> EngineResult<ExecutionPlan> {
    let nodes = vec![
        node(
            "report",
            json!({ "type": "condition", "expression": "balance.USDC > 50" }),
        )?,
        node(
            "pay",
            json!({
                "type": "x402_payment",
                "to": "0x00000000000000000000000000000000000000c3",
                "amount": "2",
                "token": "USDC"
            }),
        )?,
        node(
            "approve",
            json!({ "type": "approve_token", "token": "USDC", "amount": "50", "contract": "vvs-router" }),
        )?,
        node("quote", json!({ "type": "read_state", "contract": "vvs-router" }))?,
        node("fund", json!({ "type": "read_balance", "token": "USDC" }))?,
    ];
    let edges = vec![
        PlanEdge::new("fund", "approve"),
        PlanEdge::new("quote", "approve"),
        PlanEdge::new("approve", "pay"),
        PlanEdge::new("pay", "report"),
    ];
    Ok(ExecutionPlan::from_graph(ExecutionMode::Simulate, nodes, edges).with_plan_id("usdc-graph"))
}

/// `loop-a` and `loop-b` depend on each other; `tail` hangs off the loop.
pub fn cyclic_graph() -> EngineResult<ExecutionPlan> {
    let nodes = vec![
        node("loop-a", json!({ "type": "read_balance" }))?,
        node("loop-b", json!({ "type": "condition", "expression": "balance > 0" }))?,
        node("tail", json!({ "type": "read_state", "contract": "usdc-token" }))?,
    ];
    let edges = vec![
        PlanEdge::new("loop-a", "loop-b"),
        PlanEdge::new("loop-b", "loop-a"),
        PlanEdge::new("loop-b", "tail"),
    ];
    Ok(ExecutionPlan::from_graph(ExecutionMode::Simulate, nodes, edges).with_plan_id("cyclic"))
}

pub fn malformed_document() -> Value {
    json!({
        "mode": "dry_run",
        "actions": [
            { "type": "x402_payment", "to": "0x00000000000000000000000000000000000000a1" },
            { "type": "swap", "fromToken": "TCRO", "toToken": "USDC", "amount": "1" },
            { "type": "contract_call", "contract": "vvs-router" }
        ]
    })
}

pub fn run_scenario() -> EngineResult<()> {
    println!("=== Scenario 4: Graph Plans and Validation ===");
    println!();

    let service = PlanService::new(EngineConfig::embedded()?)?;

    let plan = usdc_payment_graph()?;
    let report = service.validate(&to_document(&plan)?);
    println!("  Test: USDC payment graph (declared report, pay, approve, quote, fund)");
    println!("  Validation:  valid={} warnings={}", report.valid, report.warnings.len());
    let outcome = service.run(&plan, ExecutionMode::Simulate)?;
    print_outcome(&outcome);
    println!();

    let plan = cyclic_graph()?;
    let report = service.validate(&to_document(&plan)?);
    println!("  Test: graph with a cycle between loop-a and loop-b");
    println!("  Validation:  valid={} warnings={}", report.valid, report.warnings.len());
    let outcome = service.run(&plan, ExecutionMode::Simulate)?;
    print_outcome(&outcome);
    println!();

    println!("  Test: malformed plan document");
    let report = service.validate(&malformed_document());
    println!("  Validation:  valid={}", report.valid);
    for error in &report.errors {
        println!("  error: {error}");
    }
    println!();

    println!("  Scenario 4 complete.");
    println!();
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
