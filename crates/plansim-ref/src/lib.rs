//! # plansim-ref
//!
//! Reference runtime for the plansim execution plan engine.
//!
//! [`service::PlanService`] wires the engine together from an
//! [`EngineConfig`](plansim_config::EngineConfig): the virtual state store,
//! the in-memory trace recorder, the standard executor registry, both
//! ledgers and the plan validator. It exposes the operations a transport
//! layer would serve: simulate, execute, validate, fetch a run, list runs,
//! health, and retention.
//!
//! The collaborators the engine consumes are mocked in-process:
//!
//! - [`mock_chain::MockChainClient`]: a single-wallet chain node with
//!   confirming, stalled, unreachable and reverting behaviors
//! - [`mock_decision::MockDecisionClient`]: canned decision answers, or a
//!   timeout
//!
//! Four scenarios walk through the engine end to end:
//!
//! 1. **Simulated payment flow**: read then pay, overdraft, rejected kinds.
//! 2. **Live execution**: fail-fast against the mock chain, pending
//!    receipts, a chain that is down at run start.
//! 3. **Agent decision**: primary answer versus the fallback heuristic.
//! 4. **Graph plans**: dependency ordering, cycles, validation reports.
//!
//! No network calls are made.

pub mod mock_chain;
pub mod mock_decision;
pub mod scenarios;
pub mod service;

pub use service::{ApiResponse, PlanService, RunRecord};

// ── Tests ─────────────────────────────────────────────────────────────────────
