//! # plansim-core
//!
//! The sequential run loop of the plansim execution plan engine.
//!
//! This crate provides:
//! - The trait seams (`ChainClient`, `DecisionClient`, `StateStore`,
//!   `TraceRecorder`, `Ledger`, `ActionExecutor`)
//! - `PlanBuilder`, which turns a node/edge graph into an ordered action list
//! - `ExecutorRegistry`, the kind → handler table
//! - The `Runner` that drives a plan through all of the above
//!
//! ## Usage
//!
//! ```rust,ignore
//! use plansim_core::{Runner, ExecutorRegistry, traits::{StateStore, TraceRecorder, Ledger}};
//! ```

pub mod builder;
pub mod registry;
pub mod runner;
pub mod traits;

pub use builder::{OrderedPlan, PlanBuilder};
pub use registry::ExecutorRegistry;
pub use runner::{LiveBackend, RunPolicy, Runner};
