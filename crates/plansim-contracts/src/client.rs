//! Data exchanged with the external collaborators: the chain client and the
//! decision-query client. The engine never implements these services; it
//! only consumes them through the traits in plansim-core.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A transaction the engine wants priced or sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxRequest {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Decimal>,
}

/// What the chain reports back after a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub tx_hash: String,
    /// Gas actually consumed. Zero when the client could not tell.
    pub gas_used: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price_gwei: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    /// False while the transaction is still in the mempool.
    pub confirmed: bool,
}

/// Answer from the decision-query collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionResponse {
    pub response: String,
    pub execution_time_ms: u64,
}
