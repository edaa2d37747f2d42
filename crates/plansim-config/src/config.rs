//! The engine configuration document.
//!
//! `EngineConfig` is deserialized from TOML. Every section is optional and
//! falls back to its `Default`, which matches the embedded
//! `config/default.toml`. After parsing, `validate` rejects values the
//! engine cannot work with.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::Duration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use plansim_contracts::{
    error::{EngineError, EngineResult},
    plan::{ErrorPolicy, ExecutionMode},
    state::ContractEntry,
};
use plansim_core::runner::RunPolicy;

use crate::gas::GasTable;

/// The embedded default configuration.
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../config/default.toml");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Wallet used when a plan does not name one in `context.walletAddress`.
    pub address: String,
    /// Balances default to this token when an action names none.
    pub native_token: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            address: "0x7a3c0000000000000000000000000000000a9e17".to_string(),
            native_token: "TCRO".to_string(),
        }
    }
}

/// Balances a new run starts with, per mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    pub simulate: BTreeMap<String, Decimal>,
    pub execute: BTreeMap<String, Decimal>,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            simulate: BTreeMap::from([
                ("TCRO".to_string(), Decimal::from(10)),
                ("USDC".to_string(), Decimal::from(100)),
            ]),
            execute: BTreeMap::from([
                ("TCRO".to_string(), Decimal::ZERO),
                ("USDC".to_string(), Decimal::ZERO),
            ]),
        }
    }
}

impl SeedConfig {
    pub fn for_mode(&self, mode: ExecutionMode) -> &BTreeMap<String, Decimal> {
        match mode {
            ExecutionMode::Simulate => &self.simulate,
            ExecutionMode::Execute => &self.execute,
        }
    }
}

/// Tuning for the `llm_agent` heuristic used when the decision client is
/// unavailable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    /// Execute only when the native balance is strictly above this.
    pub threshold: Decimal,
    /// Share of the balance to recommend, in (0, 1].
    pub fraction: Decimal,
    /// Upper bound on the recommended amount.
    pub cap: Decimal,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            threshold: Decimal::new(1, 1),
            fraction: Decimal::new(1, 1),
            cap: Decimal::ONE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub simulate: ErrorPolicy,
    pub execute: ErrorPolicy,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        let policy = RunPolicy::default();
        Self {
            simulate: policy.simulate,
            execute: policy.execute,
        }
    }
}

/// Longest retention window `validate` accepts: ten years.
pub const MAX_RETENTION_SECS: u64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Runs older than this are evicted by the janitor.
    pub max_age_secs: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self { max_age_secs: 3600 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    /// Accept execute-mode plans.
    pub execute: bool,
    /// Wire a decision client into `llm_agent`.
    pub decision: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            execute: true,
            decision: true,
        }
    }
}

/// Top-level configuration for one engine instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub wallet: WalletConfig,
    pub seeds: SeedConfig,
    /// Well-known contracts every run's registry starts with.
    pub contracts: BTreeMap<String, ContractEntry>,
    pub gas: GasTable,
    pub decision: DecisionConfig,
    pub runner: RunnerConfig,
    pub retention: RetentionConfig,
    pub features: FeatureFlags,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let contract = |address: &str| ContractEntry {
            address: address.to_string(),
            deployed: true,
        };
        Self {
            wallet: WalletConfig::default(),
            seeds: SeedConfig::default(),
            contracts: BTreeMap::from([
                (
                    "x402-facilitator".to_string(),
                    contract("0x5e1f0000000000000000000000000000000fac11"),
                ),
                (
                    "usdc-token".to_string(),
                    contract("0xc21223249ca28397b4b6541dffaecc539bff0c59"),
                ),
                (
                    "vvs-router".to_string(),
                    contract("0x145863eb42cf62847a6ca784e6416c1682b1b2ae"),
                ),
                (
                    "agent-wallet".to_string(),
                    contract("0x7a3c0000000000000000000000000000000a9e17"),
                ),
            ]),
            gas: GasTable::default(),
            decision: DecisionConfig::default(),
            runner: RunnerConfig::default(),
            retention: RetentionConfig::default(),
            features: FeatureFlags::default(),
        }
    }
}

impl EngineConfig {
    /// Parse `s` as TOML and validate the result.
    ///
    /// Returns `EngineError::ConfigError` if the TOML is malformed, does not
    /// match the expected shape, or carries values the engine rejects.
    pub fn from_toml_str(s: &str) -> EngineResult<Self> {
        let config: EngineConfig = toml::from_str(s).map_err(|e| EngineError::ConfigError {
            reason: format!("failed to parse engine TOML: {}", e),
        })?;
        config.validate()?;
        debug!(
            native_token = %config.wallet.native_token,
            contracts = config.contracts.len(),
            "engine configuration loaded"
        );
        Ok(config)
    }

    /// Read the file at `path` and parse it as engine configuration.
    pub fn from_file(path: &Path) -> EngineResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| EngineError::ConfigError {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// The embedded `config/default.toml`, parsed.
    pub fn embedded() -> EngineResult<Self> {
        Self::from_toml_str(DEFAULT_CONFIG_TOML)
    }

    pub fn run_policy(&self) -> RunPolicy {
        RunPolicy {
            simulate: self.runner.simulate,
            execute: self.runner.execute,
        }
    }

    pub fn retention(&self) -> Duration {
        let secs = self.retention.max_age_secs.min(MAX_RETENTION_SECS);
        Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX))
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> EngineResult<()> {
        let invalid = |reason: String| Err(EngineError::ConfigError { reason });

        if self.wallet.address.trim().is_empty() {
            return invalid("wallet.address must not be empty".to_string());
        }
        if self.wallet.native_token.trim().is_empty() {
            return invalid("wallet.native_token must not be empty".to_string());
        }

        for (mode, seeds) in [("simulate", &self.seeds.simulate), ("execute", &self.seeds.execute)] {
            if let Some((token, amount)) = seeds.iter().find(|(_, a)| a.is_sign_negative()) {
                return invalid(format!("seeds.{mode}.{token} must not be negative, got {amount}"));
            }
        }

        if let Some((name, _)) = self
            .contracts
            .iter()
            .find(|(_, c)| c.address.trim().is_empty())
        {
            return invalid(format!("contracts.{name}.address must not be empty"));
        }

        if self.gas.price_gwei.is_sign_negative() {
            return invalid(format!("gas.price_gwei must not be negative, got {}", self.gas.price_gwei));
        }

        let d = &self.decision;
        if d.fraction <= Decimal::ZERO || d.fraction > Decimal::ONE {
            return invalid(format!("decision.fraction must be in (0, 1], got {}", d.fraction));
        }
        if d.threshold.is_sign_negative() {
            return invalid(format!("decision.threshold must not be negative, got {}", d.threshold));
        }
        if d.cap <= Decimal::ZERO {
            return invalid(format!("decision.cap must be greater than zero, got {}", d.cap));
        }

        if self.retention.max_age_secs == 0 {
            return invalid("retention.max_age_secs must be greater than zero".to_string());
        }
        if self.retention.max_age_secs > MAX_RETENTION_SECS {
            return invalid(format!(
                "retention.max_age_secs must be at most {MAX_RETENTION_SECS}, got {}",
                self.retention.max_age_secs
            ));
        }

        Ok(())
    }
}
