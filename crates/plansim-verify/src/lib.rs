//! # plansim-verify
//!
//! Side-effect-free plan validation.
//!
//! ## Overview
//!
//! [`PlanValidator`] answers "would this plan be accepted, and what looks
//! wrong with it?" without creating a run. The answer is a
//! [`ValidationReport`](plansim_contracts::validate::ValidationReport):
//! `valid` is true exactly when there are no errors. Warnings (graph
//! anomalies, ignored fields) never invalidate a plan.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use plansim_verify::PlanValidator;
//!
//! let report = PlanValidator::new()?.validate_json(&document);
//! if !report.valid {
//!     for e in &report.errors { eprintln!("{e}"); }
//! }
//! ```

pub mod schema;
pub mod validator;

pub use validator::PlanValidator;

// ── Tests ─────────────────────────────────────────────────────────────────────
