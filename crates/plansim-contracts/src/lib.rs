//! # plansim-contracts
//!
//! Shared types for the plansim execution plan engine.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate, only data definitions, invariant-preserving constructors and
//! error types.

pub mod action;
pub mod client;
pub mod error;
pub mod plan;
pub mod result;
pub mod state;
pub mod trace;
pub mod validate;
