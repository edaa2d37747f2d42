//! Virtual ledger state owned by one run.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::plan::{ExecutionMode, RunId};

/// The run's wallet. Balances serialize as decimal strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub address: String,
    /// Token symbol → balance. Never negative.
    pub balances: BTreeMap<String, Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<u64>,
}

/// One entry of the contract registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractEntry {
    pub address: String,
    pub deployed: bool,
}

/// Everything a run can read or mutate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualState {
    pub run_id: RunId,
    pub mode: ExecutionMode,
    pub wallet: Wallet,
    /// Contract name → entry.
    pub contracts: BTreeMap<String, ContractEntry>,
    pub created_at: DateTime<Utc>,
}

impl VirtualState {
    /// Balance of `token`, zero when the wallet has never held it.
    pub fn balance(&self, token: &str) -> Decimal {
        self.wallet
            .balances
            .get(token)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// A registry entry that exists and is deployed.
    pub fn deployed_contract(&self, name: &str) -> Option<&ContractEntry> {
        self.contracts.get(name).filter(|c| c.deployed)
    }
}
