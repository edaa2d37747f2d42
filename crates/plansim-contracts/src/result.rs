//! Per-step results.
//!
//! `ActionResult` is what every executor produces and what the trace stores.
//! Build it through the constructors: they keep the message invariant
//! (`error` always carries one, nothing else does).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::action::ExecutionAction;

/// Outcome of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Success,
    Error,
    /// Settled on the virtual ledger only.
    Simulated,
    /// Submitted to the chain, not yet confirmed.
    Pending,
}

/// Gas accounting for a step that would cost gas on chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasInfo {
    pub gas_used: u64,
    pub gas_price_gwei: Decimal,
    /// `gas_used * gas_price_gwei`, in native token units.
    pub estimated_cost: Decimal,
}

impl GasInfo {
    /// Price `gas_used` at `gas_price_gwei`. A cost too large for a
    /// `Decimal` saturates at `Decimal::MAX`.
    pub fn new(gas_used: u64, gas_price_gwei: Decimal) -> Self {
        Self::checked(gas_used, gas_price_gwei).unwrap_or(Self {
            gas_used,
            gas_price_gwei,
            estimated_cost: Decimal::MAX,
        })
    }

    /// `None` when the cost does not fit in a `Decimal`.
    pub fn checked(gas_used: u64, gas_price_gwei: Decimal) -> Option<Self> {
        let estimated_cost = Decimal::from(gas_used)
            .checked_mul(gas_price_gwei)?
            .checked_div(Decimal::from(1_000_000_000u64))?
            .normalize();
        Some(Self {
            gas_used,
            gas_price_gwei,
            estimated_cost,
        })
    }
}

/// The record of one dispatched action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    /// The action that produced this result.
    pub action: ExecutionAction,
    pub status: ActionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas: Option<GasInfo>,
    /// Present if and only if `status` is `Error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ActionResult {
    fn with_status(action: ExecutionAction, status: ActionStatus, payload: Value) -> Self {
        Self {
            action,
            status,
            result: Some(payload),
            tx_hash: None,
            gas: None,
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn success(action: ExecutionAction, payload: Value) -> Self {
        Self::with_status(action, ActionStatus::Success, payload)
    }

    pub fn simulated(action: ExecutionAction, payload: Value) -> Self {
        Self::with_status(action, ActionStatus::Simulated, payload)
    }

    pub fn pending(action: ExecutionAction, payload: Value) -> Self {
        Self::with_status(action, ActionStatus::Pending, payload)
    }

    /// An `error` result. A blank message is replaced so the invariant holds.
    pub fn error(action: ExecutionAction, message: impl Into<String>) -> Self {
        let mut message = message.into();
        if message.trim().is_empty() {
            message = format!("{} action failed", action.kind_name());
        }
        Self {
            action,
            status: ActionStatus::Error,
            result: None,
            tx_hash: None,
            gas: None,
            error: Some(message),
            timestamp: Utc::now(),
        }
    }

    /// Attach a transaction hash and gas figures.
    pub fn with_tx(mut self, tx_hash: impl Into<String>, gas: GasInfo) -> Self {
        self.tx_hash = Some(tx_hash.into());
        self.gas = Some(gas);
        self
    }

    pub fn is_error(&self) -> bool {
        self.status == ActionStatus::Error
    }
}
