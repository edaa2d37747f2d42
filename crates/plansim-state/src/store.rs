//! In-memory implementation of `StateStore`.
//!
//! `VirtualStateStore` keeps every run's `VirtualState` in one map behind a
//! `Mutex`. A run's entry is only ever touched by that run's own sequential
//! loop, so the single lock guards the map, not the runs.
//!
//! Balances are `Decimal` and always stored normalized, so `10 - 0.5`
//! serializes as `"9.5"`.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use plansim_config::{EngineConfig, SeedConfig};
use plansim_contracts::{
    error::{EngineError, EngineResult},
    plan::{ExecutionMode, RunId},
    state::{ContractEntry, VirtualState, Wallet},
};
use plansim_core::traits::{ChainClient, StateStore};

/// Process-wide map of run id → virtual state.
///
/// Construct once at startup and share it (it is cheap to clone; clones see
/// the same runs).
#[derive(Clone)]
pub struct VirtualStateStore {
    native_token: String,
    seeds: SeedConfig,
    contracts: BTreeMap<String, ContractEntry>,
    runs: Arc<Mutex<HashMap<RunId, VirtualState>>>,
}

impl VirtualStateStore {
    pub fn new(
        native_token: impl Into<String>,
        seeds: SeedConfig,
        contracts: BTreeMap<String, ContractEntry>,
    ) -> Self {
        Self {
            native_token: native_token.into(),
            seeds,
            contracts,
            runs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.wallet.native_token.clone(),
            config.seeds.clone(),
            config.contracts.clone(),
        )
    }

    /// Number of live runs.
    pub fn len(&self) -> usize {
        self.runs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs().is_empty()
    }

    /// Replace or add one contract in a run's registry.
    pub fn set_contract(&self, run_id: &RunId, name: &str, entry: ContractEntry) -> bool {
        self.with_run(run_id, |state| {
            state.contracts.insert(name.to_string(), entry);
            true
        })
        .unwrap_or(false)
    }

    /// Poisoning is ignored; no mutation below can panic halfway.
    pub(crate) fn runs(&self) -> MutexGuard<'_, HashMap<RunId, VirtualState>> {
        self.runs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_run<T>(&self, run_id: &RunId, f: impl FnOnce(&mut VirtualState) -> T) -> Option<T> {
        let mut runs = self.runs();
        match runs.get_mut(run_id) {
            Some(state) => Some(f(state)),
            None => {
                warn!(run_id = %run_id, "state operation on unknown run");
                None
            }
        }
    }

    fn seed_balances(&self, mode: ExecutionMode) -> BTreeMap<String, Decimal> {
        let mut balances: BTreeMap<String, Decimal> = self
            .seeds
            .for_mode(mode)
            .iter()
            .map(|(token, amount)| (token.clone(), amount.normalize()))
            .collect();
        balances
            .entry(self.native_token.clone())
            .or_insert(Decimal::ZERO);
        balances
    }
}

impl StateStore for VirtualStateStore {
    fn create(&self, run_id: RunId, mode: ExecutionMode, wallet_address: &str) -> VirtualState {
        let state = VirtualState {
            run_id,
            mode,
            wallet: Wallet {
                address: wallet_address.to_string(),
                balances: self.seed_balances(mode),
                nonce: None,
            },
            contracts: self.contracts.clone(),
            created_at: Utc::now(),
        };

        debug!(
            run_id = %run_id,
            mode = %mode,
            tokens = state.wallet.balances.len(),
            contracts = state.contracts.len(),
            "run state created"
        );

        self.runs().insert(run_id, state.clone());
        state
    }

    fn get(&self, run_id: &RunId) -> Option<VirtualState> {
        self.runs().get(run_id).cloned()
    }

    fn set_balance(&self, run_id: &RunId, token: &str, amount: Decimal) -> bool {
        if amount < Decimal::ZERO {
            return false;
        }
        self.with_run(run_id, |state| {
            state
                .wallet
                .balances
                .insert(token.to_string(), amount.normalize());
            true
        })
        .unwrap_or(false)
    }

    fn deduct(&self, run_id: &RunId, token: &str, amount: Decimal) -> bool {
        if amount < Decimal::ZERO {
            return false;
        }
        self.with_run(run_id, |state| {
            let available = state.balance(token);
            if available < amount {
                debug!(
                    run_id = %run_id,
                    token,
                    available = %available,
                    required = %amount,
                    "deduction rejected: insufficient funds"
                );
                return false;
            }
            state
                .wallet
                .balances
                .insert(token.to_string(), (available - amount).normalize());
            true
        })
        .unwrap_or(false)
    }

    fn credit(&self, run_id: &RunId, token: &str, amount: Decimal) -> bool {
        if amount < Decimal::ZERO {
            return false;
        }
        self.with_run(run_id, |state| {
            let updated = (state.balance(token) + amount).normalize();
            state.wallet.balances.insert(token.to_string(), updated);
            true
        })
        .unwrap_or(false)
    }

    fn load_from_chain(&self, run_id: &RunId, chain: &dyn ChainClient) -> EngineResult<Decimal> {
        let address = self
            .get(run_id)
            .map(|s| s.wallet.address)
            .ok_or_else(|| EngineError::UnknownRun {
                run_id: run_id.to_string(),
            })?;

        let balance = chain.get_balance(&address)?;
        if !self.set_balance(run_id, &self.native_token, balance) {
            return Err(EngineError::Chain {
                reason: format!("chain reported an unusable balance {balance} for {address}"),
            });
        }

        info!(
            run_id = %run_id,
            address = %address,
            token = %self.native_token,
            balance = %balance,
            "native balance loaded from chain"
        );
        Ok(balance.normalize())
    }

    fn evict_older_than(&self, max_age: Duration) -> usize {
        let Some(cutoff) = Utc::now().checked_sub_signed(max_age) else {
            return 0;
        };
        let mut runs = self.runs();
        let before = runs.len();
        runs.retain(|_, state| state.created_at >= cutoff);
        let evicted = before - runs.len();
        if evicted > 0 {
            info!(evicted, remaining = runs.len(), "evicted expired run state");
        }
        evicted
    }

    fn native_token(&self) -> &str {
        &self.native_token
    }
}
