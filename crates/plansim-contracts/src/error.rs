//! Engine error types.
//!
//! All fallible operations in the plan engine return `EngineResult<T>`.
//! Executors surface these as `error` step results; the display text of each
//! variant is the message recorded in the trace, so wording matters.

use rust_decimal::Decimal;
use thiserror::Error;

/// The unified error type for the plan engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The plan contains no actions and no graph nodes.
    #[error("execution plan contains no actions")]
    EmptyPlan,

    /// The plan document is structurally malformed.
    #[error("invalid execution plan: {reason}")]
    InvalidPlan { reason: String },

    /// A field required by the action kind is absent or empty.
    #[error("{kind} action requires '{field}'")]
    MissingField { kind: String, field: String },

    /// A field is present but carries an unusable value.
    #[error("{kind} action has invalid '{field}': {reason}")]
    InvalidField {
        kind: String,
        field: String,
        reason: String,
    },

    /// No executor is registered for this action kind.
    #[error("Unsupported action type: {kind}")]
    UnsupportedAction { kind: String },

    /// A deduction would take a balance below zero.
    #[error("Insufficient {token} balance: available {available}, required {required}")]
    InsufficientFunds {
        token: String,
        available: Decimal,
        required: Decimal,
    },

    /// The referenced contract is missing from the registry or not deployed.
    #[error("{name} not found or not deployed")]
    ContractUnavailable { name: String },

    /// No state or trace exists for the given run.
    #[error("unknown run '{run_id}'")]
    UnknownRun { run_id: String },

    /// The trace was completed or failed; it no longer accepts entries.
    #[error("trace for run '{run_id}' is finalized")]
    TraceFinalized { run_id: String },

    /// Appending would record more steps than the plan has actions.
    #[error("trace for run '{run_id}' already holds {limit} step(s)")]
    TraceOverflow { run_id: String, limit: usize },

    /// The live chain client reported a network or RPC failure.
    #[error("chain client error: {reason}")]
    Chain { reason: String },

    /// The decision-query client failed or timed out.
    #[error("decision client error: {reason}")]
    Decision { reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// A JSON Schema check could not be performed.
    #[error("schema validation error: {reason}")]
    SchemaValidation { reason: String },
}

/// Convenience alias used throughout the plansim crates.
pub type EngineResult<T> = Result<T, EngineError>;
