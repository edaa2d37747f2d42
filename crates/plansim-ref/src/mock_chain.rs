//! In-process stand-in for a chain node.
//!
//! Nothing here opens a socket. `MockChainClient` holds a single native
//! balance for the agent wallet, numbers blocks sequentially and hands back
//! receipts whose shape depends on the configured [`ChainBehavior`]. It is
//! what the reference runtime wires into execute mode.

use std::sync::{Mutex, MutexGuard, PoisonError};

use rust_decimal::Decimal;
use serde_json::Value;
use tracing::debug;

use plansim_contracts::{
    client::{TxReceipt, TxRequest},
    error::{EngineError, EngineResult},
};
use plansim_core::traits::ChainClient;

/// How the mock node answers submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChainBehavior {
    /// Every submission is mined immediately.
    #[default]
    Confirming,
    /// Submissions are accepted but stay in the mempool.
    Unconfirmed,
    /// Every call fails as if the RPC endpoint were down.
    Unreachable,
    /// Payments go through; contract calls revert.
    RevertingContracts,
}

struct NodeLedger {
    balance: Decimal,
    block: u64,
    submitted: Vec<String>,
}

pub struct MockChainClient {
    native_token: String,
    behavior: ChainBehavior,
    ledger: Mutex<NodeLedger>,
}

impl MockChainClient {
    pub fn new(native_token: impl Into<String>, balance: Decimal) -> Self {
        Self {
            native_token: native_token.into(),
            behavior: ChainBehavior::default(),
            ledger: Mutex::new(NodeLedger {
                balance,
                block: 0,
                submitted: Vec::new(),
            }),
        }
    }

    pub fn with_behavior(mut self, behavior: ChainBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// The node's current view of the native balance.
    pub fn balance(&self) -> Decimal {
        self.ledger().balance
    }

    /// Every accepted submission, oldest first.
    pub fn submitted(&self) -> Vec<String> {
        self.ledger().submitted.clone()
    }

    fn ledger(&self) -> MutexGuard<'_, NodeLedger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reachable(&self) -> EngineResult<()> {
        if self.behavior == ChainBehavior::Unreachable {
            return Err(EngineError::Chain {
                reason: "connection refused by RPC endpoint".to_string(),
            });
        }
        Ok(())
    }

    fn confirms(&self) -> bool {
        self.behavior != ChainBehavior::Unconfirmed
    }

    fn debit(&self, ledger: &mut NodeLedger, amount: Decimal) -> EngineResult<()> {
        if amount > ledger.balance {
            return Err(EngineError::Chain {
                reason: format!(
                    "insufficient funds for gas * price + value: have {}, want {}",
                    ledger.balance, amount
                ),
            });
        }
        if self.confirms() {
            ledger.balance -= amount;
        }
        Ok(())
    }

    fn receipt(&self, ledger: &mut NodeLedger, entry: String, gas_used: u64) -> TxReceipt {
        ledger.block += 1;
        ledger.submitted.push(entry);
        let confirmed = self.confirms();
        TxReceipt {
            tx_hash: format!("0x{:064x}", ledger.block),
            gas_used,
            gas_price_gwei: None,
            block_number: confirmed.then_some(ledger.block),
            confirmed,
        }
    }
}

impl ChainClient for MockChainClient {
    fn get_balance(&self, _address: &str) -> EngineResult<Decimal> {
        self.reachable()?;
        Ok(self.balance())
    }

    fn send_payment(&self, to: &str, amount: Decimal, token: &str) -> EngineResult<TxReceipt> {
        self.reachable()?;
        let mut ledger = self.ledger();
        let gas_used = if token == self.native_token {
            self.debit(&mut ledger, amount)?;
            21_000
        } else {
            52_000
        };
        debug!(to, %amount, token, "mock chain accepted transfer");
        Ok(self.receipt(&mut ledger, format!("transfer {amount} {token} -> {to}"), gas_used))
    }

    /// Contract receipts report no gas so callers fall back to
    /// `estimate_gas`.
    fn call_contract(
        &self,
        address: &str,
        method: &str,
        _args: &[Value],
        value: Option<Decimal>,
    ) -> EngineResult<TxReceipt> {
        self.reachable()?;
        if self.behavior == ChainBehavior::RevertingContracts {
            return Err(EngineError::Chain {
                reason: format!("execution reverted: {method}"),
            });
        }
        let mut ledger = self.ledger();
        if let Some(value) = value.filter(|v| !v.is_zero()) {
            self.debit(&mut ledger, value)?;
        }
        debug!(address, method, "mock chain accepted contract call");
        Ok(self.receipt(&mut ledger, format!("call {address}.{method}"), 0))
    }

    fn estimate_gas(&self, tx: &TxRequest) -> EngineResult<u64> {
        self.reachable()?;
        Ok(match tx.method.as_deref() {
            None => 21_000,
            Some(method) if method.eq_ignore_ascii_case("approve") => 46_000,
            Some(_) => 120_000,
        })
    }
}
