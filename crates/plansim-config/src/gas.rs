//! Synthetic gas figures for simulated settlements.
//!
//! Contract calls are banded by method name: the first keyword list that
//! matches (case-insensitive substring) picks the band, checked in the order
//! execute → approve → transfer. Anything else gets the default band.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use plansim_contracts::result::GasInfo;

/// Which gas figure an operation is charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasBand {
    /// A plain native-token transfer.
    Transfer,
    Approve,
    /// Execute-, swap- or settle-like contract methods.
    Execute,
    /// Token transfers through a contract.
    TransferLike,
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GasTable {
    pub price_gwei: Decimal,
    pub transfer: u64,
    pub approve: u64,
    pub execute: u64,
    pub transfer_like: u64,
    pub default: u64,
    pub execute_methods: Vec<String>,
    pub approve_methods: Vec<String>,
    pub transfer_methods: Vec<String>,
}

impl Default for GasTable {
    fn default() -> Self {
        Self {
            price_gwei: Decimal::from(5000),
            transfer: 21_000,
            approve: 46_000,
            execute: 150_000,
            transfer_like: 65_000,
            default: 100_000,
            execute_methods: words(&["execute", "swap", "settle"]),
            approve_methods: words(&["approve"]),
            transfer_methods: words(&["transfer", "pay", "send"]),
        }
    }
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

impl GasTable {
    /// Band a contract method by name.
    pub fn band_for_method(&self, method: &str) -> GasBand {
        let method = method.to_ascii_lowercase();
        let hit = |keywords: &[String]| {
            keywords
                .iter()
                .any(|k| !k.is_empty() && method.contains(&k.to_ascii_lowercase()))
        };

        if hit(&self.execute_methods) {
            GasBand::Execute
        } else if hit(&self.approve_methods) {
            GasBand::Approve
        } else if hit(&self.transfer_methods) {
            GasBand::TransferLike
        } else {
            GasBand::Default
        }
    }

    pub fn units(&self, band: GasBand) -> u64 {
        match band {
            GasBand::Transfer => self.transfer,
            GasBand::Approve => self.approve,
            GasBand::Execute => self.execute,
            GasBand::TransferLike => self.transfer_like,
            GasBand::Default => self.default,
        }
    }

    /// Gas figures for `band` at the configured price.
    pub fn estimate(&self, band: GasBand) -> GasInfo {
        GasInfo::new(self.units(band), self.price_gwei)
    }
}
