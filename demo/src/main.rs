//! plansim demo CLI
//!
//! Runs plan files through the reference `PlanService`, validates them,
//! reports health, or plays the built-in scenarios. Execute mode talks to the
//! in-process mock chain; nothing leaves the process.
//!
//! Usage:
//!   cargo run -p plansim-demo -- run-all
//!   cargo run -p plansim-demo -- simulate demo/plans/read-then-pay.json
//!   cargo run -p plansim-demo -- execute demo/plans/read-then-pay.json --chain-balance 25
//!   cargo run -p plansim-demo -- validate demo/plans/usdc-graph.json
//!   cargo run -p plansim-demo -- --config engine.toml health

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use plansim_config::EngineConfig;
use plansim_contracts::{
    error::{EngineError, EngineResult},
    plan::ExecutionMode,
};
use plansim_ref::{
    mock_chain::MockChainClient,
    mock_decision::{DecisionMode, MockDecisionClient},
    scenarios::{agent_decision, graph_plan, live_execution, payment_flow},
    PlanService,
};

// ── CLI definition ────────────────────────────────────────────────────────────

/// plansim: simulate and execute declarative agent plans.
#[derive(Parser)]
#[command(
    name = "plansim-demo",
    about = "plansim execution plan engine demo",
    long_about = "Runs execution plans against a virtual ledger or a mock chain,\n\
                  validates plan documents, and plays the built-in scenarios."
)]
struct Cli {
    /// Engine configuration TOML. Defaults to the embedded configuration.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum Decision {
    Approving,
    Declining,
    Offline,
    /// No decision service; llm_agent always falls back.
    Off,
}

#[derive(Subcommand)]
enum Command {
    /// Simulate a plan file against the virtual ledger.
    Simulate {
        plan: PathBuf,
        /// How the mock decision service answers llm_agent steps.
        #[arg(long, value_enum, default_value = "approving")]
        decision: Decision,
    },
    /// Execute a plan file against the in-process mock chain.
    Execute {
        plan: PathBuf,
        /// Native balance the mock chain starts with.
        #[arg(long, default_value = "10")]
        chain_balance: Decimal,
        #[arg(long, value_enum, default_value = "approving")]
        decision: Decision,
    },
    /// Check a plan file without running it.
    Validate { plan: PathBuf },
    /// Print feature flags and supported actions.
    Health,
    /// Run all four scenarios in sequence.
    RunAll,
    /// Scenario 1: read then pay on the virtual ledger.
    PaymentFlow,
    /// Scenario 2: execute mode with fail-fast against a mock chain.
    LiveExecution,
    /// Scenario 3: llm_agent primary answer versus fallback.
    AgentDecision,
    /// Scenario 4: graph ordering, cycles and validation.
    GraphPlan,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // RUST_LOG=debug for per-step events.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    if let Err(e) = dispatch(cli) {
        eprintln!("plansim error: {}", e);
        std::process::exit(1);
    }
}

fn dispatch(cli: Cli) -> EngineResult<()> {
    match cli.command {
        Command::Simulate { plan, decision } => {
            let config = load_config(cli.config.as_deref())?;
            let service = with_decision(PlanService::new(config)?, decision);
            let response = service.submit(&read_plan(&plan)?, ExecutionMode::Simulate);
            print_json(&response)
        }
        Command::Execute {
            plan,
            chain_balance,
            decision,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let chain = Arc::new(MockChainClient::new(
                config.wallet.native_token.clone(),
                chain_balance,
            ));
            let service = with_decision(PlanService::new(config)?, decision).with_chain(chain);
            let response = service.submit(&read_plan(&plan)?, ExecutionMode::Execute);
            print_json(&response)
        }
        Command::Validate { plan } => {
            let service = PlanService::new(load_config(cli.config.as_deref())?)?;
            print_json(&service.validate(&read_plan(&plan)?))
        }
        Command::Health => {
            let service = PlanService::new(load_config(cli.config.as_deref())?)?;
            print_json(&service.health())
        }
        Command::RunAll => {
            print_banner();
            payment_flow::run_scenario()?;
            live_execution::run_scenario()?;
            agent_decision::run_scenario()?;
            graph_plan::run_scenario()?;
            println!("All scenarios completed successfully.");
            Ok(())
        }
        Command::PaymentFlow => payment_flow::run_scenario(),
        Command::LiveExecution => live_execution::run_scenario(),
        Command::AgentDecision => agent_decision::run_scenario(),
        Command::GraphPlan => graph_plan::run_scenario(),
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn load_config(path: Option<&Path>) -> EngineResult<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_file(path),
        None => EngineConfig::embedded(),
    }
}

fn with_decision(service: PlanService, decision: Decision) -> PlanService {
    let mode = match decision {
        Decision::Approving => DecisionMode::Approving,
        Decision::Declining => DecisionMode::Declining,
        Decision::Offline => DecisionMode::Offline,
        Decision::Off => return service,
    };
    service.with_decision(Arc::new(MockDecisionClient::new(mode)))
}

fn read_plan(path: &Path) -> EngineResult<Value> {
    let contents = std::fs::read_to_string(path).map_err(|e| EngineError::InvalidPlan {
        reason: format!("failed to read plan file '{}': {}", path.display(), e),
    })?;
    debug!(path = %path.display(), bytes = contents.len(), "plan file read");
    serde_json::from_str(&contents).map_err(|e| EngineError::InvalidPlan {
        reason: format!("plan file '{}' is not valid JSON: {}", path.display(), e),
    })
}

fn print_json<T: Serialize>(value: &T) -> EngineResult<()> {
    let rendered = serde_json::to_string_pretty(value).map_err(|e| EngineError::InvalidPlan {
        reason: format!("failed to render response: {e}"),
    })?;
    println!("{rendered}");
    Ok(())
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("plansim: Execution Plan Engine");
    println!("==============================");
    println!();
    println!("Per run:");
    println!("  [1] Order the plan (graph plans via dependency sort)");
    println!("  [2] Create virtual state; reconcile with the chain in execute mode");
    println!("  [3] Dispatch each step to the executor for its kind");
    println!("  [4] Append every result to the run's trace");
    println!("  [5] Continue (simulate) or stop at the first failure (execute)");
    println!();
}
