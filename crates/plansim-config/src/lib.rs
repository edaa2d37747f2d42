//! # plansim-config
//!
//! TOML configuration for the plansim engine.
//!
//! ## Overview
//!
//! [`EngineConfig`] collects everything a deployment tunes: the default
//! wallet and native token, the balances each mode seeds a new run with, the
//! registry of well-known contracts, the synthetic gas table, the decision
//! fallback heuristic, the error policy per mode, the retention window and
//! feature flags.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use plansim_config::EngineConfig;
//!
//! let config = EngineConfig::from_file(Path::new("plansim.toml"))?;
//! ```
//!
//! Every section may be omitted; missing sections keep the values shipped in
//! `config/default.toml`.

pub mod config;
pub mod gas;

pub use config::{
    DecisionConfig, EngineConfig, FeatureFlags, RetentionConfig, RunnerConfig, SeedConfig,
    WalletConfig, DEFAULT_CONFIG_TOML, MAX_RETENTION_SECS,
};
pub use gas::{GasBand, GasTable};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;

    use plansim_contracts::{
        error::EngineError,
        plan::{ErrorPolicy, ExecutionMode},
    };

    use crate::{EngineConfig, GasBand, GasTable, MAX_RETENTION_SECS};

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn config_error(toml: &str) -> String {
        match EngineConfig::from_toml_str(toml) {
            Err(EngineError::ConfigError { reason }) => reason,
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }

    // ── 1. embedded defaults ──────────────────────────────────────────────────

    /// The shipped TOML and the in-code defaults describe the same engine.
    #[test]
    fn test_embedded_file_matches_defaults() {
        let embedded = EngineConfig::embedded().unwrap();
        assert_eq!(embedded, EngineConfig::default());
    }

    #[test]
    fn test_default_values() {
        let config = EngineConfig::default();

        assert_eq!(config.wallet.native_token, "TCRO");
        assert_eq!(config.seeds.for_mode(ExecutionMode::Simulate)["TCRO"], dec("10"));
        assert_eq!(config.seeds.for_mode(ExecutionMode::Simulate)["USDC"], dec("100"));
        assert_eq!(config.seeds.for_mode(ExecutionMode::Execute)["TCRO"], Decimal::ZERO);
        assert!(config.contracts.values().all(|c| c.deployed));
        assert!(config.contracts.contains_key("x402-facilitator"));
        assert_eq!(config.run_policy().simulate, ErrorPolicy::ContinueOnError);
        assert_eq!(config.run_policy().execute, ErrorPolicy::FailFast);
        assert_eq!(config.retention().num_seconds(), 3600);
    }

    // ── 2. partial overrides ──────────────────────────────────────────────────

    /// Sections that are left out keep their defaults.
    #[test]
    fn test_partial_override_keeps_other_sections() {
        let config = EngineConfig::from_toml_str(
            r#"
            [wallet]
            native_token = "ETH"

            [runner]
            simulate = "fail-fast"
            "#,
        )
        .unwrap();

        assert_eq!(config.wallet.native_token, "ETH");
        assert!(!config.wallet.address.is_empty());
        assert_eq!(config.runner.simulate, ErrorPolicy::FailFast);
        assert_eq!(config.runner.execute, ErrorPolicy::FailFast);
        assert_eq!(config.gas, GasTable::default());
    }

    #[test]
    fn test_contract_registry_override() {
        let config = EngineConfig::from_toml_str(
            r#"
            [contracts.escrow]
            address = "0xe5c0"
            deployed = false
            "#,
        )
        .unwrap();

        assert_eq!(config.contracts.len(), 1);
        assert!(!config.contracts["escrow"].deployed);
    }

    // ── 3. rejected values ────────────────────────────────────────────────────

    #[test]
    fn test_toml_parse_error() {
        let reason = config_error("this is not valid toml ][[[");
        assert!(reason.contains("failed to parse engine TOML"), "got: {reason}");
    }

    #[test]
    fn test_unparsable_decimal_is_rejected() {
        let reason = config_error(
            r#"
            [decision]
            threshold = "a lot"
            "#,
        );
        assert!(reason.contains("failed to parse"), "got: {reason}");
    }

    #[test]
    fn test_fraction_out_of_range() {
        let reason = config_error(
            r#"
            [decision]
            fraction = "1.5"
            "#,
        );
        assert!(reason.contains("decision.fraction"), "got: {reason}");
    }

    #[test]
    fn test_zero_retention_is_rejected() {
        let reason = config_error(
            r#"
            [retention]
            max_age_secs = 0
            "#,
        );
        assert!(reason.contains("retention.max_age_secs"), "got: {reason}");
    }

    #[test]
    fn test_retention_beyond_ten_years_is_rejected() {
        let reason = config_error(
            r#"
            [retention]
            max_age_secs = 10000000000000
            "#,
        );
        assert!(reason.contains("must be at most"), "got: {reason}");

        let mut config = EngineConfig::default();
        config.retention.max_age_secs = MAX_RETENTION_SECS;
        assert!(config.validate().is_ok());
        assert_eq!(config.retention().num_seconds(), 315_360_000);
    }

    #[test]
    fn test_negative_seed_is_rejected() {
        let reason = config_error(
            r#"
            [seeds.simulate]
            TCRO = "-1"
            "#,
        );
        assert!(reason.contains("seeds.simulate.TCRO"), "got: {reason}");
    }

    #[test]
    fn test_blank_native_token_is_rejected() {
        let reason = config_error(
            r#"
            [wallet]
            native_token = "  "
            "#,
        );
        assert!(reason.contains("native_token"), "got: {reason}");
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = EngineConfig::from_file(std::path::Path::new("/nonexistent/plansim.toml"));
        assert!(matches!(result, Err(EngineError::ConfigError { .. })));
    }

    // ── 4. gas banding ────────────────────────────────────────────────────────

    #[test]
    fn test_gas_bands_by_method_name() {
        let gas = GasTable::default();

        assert_eq!(gas.band_for_method("executeSettlement"), GasBand::Execute);
        assert_eq!(gas.band_for_method("swapExactTokens"), GasBand::Execute);
        assert_eq!(gas.band_for_method("approve"), GasBand::Approve);
        assert_eq!(gas.band_for_method("transferFrom"), GasBand::TransferLike);
        assert_eq!(gas.band_for_method("balanceOf"), GasBand::Default);

        assert!(gas.units(GasBand::Execute) > gas.units(GasBand::Approve));
        assert_eq!(gas.units(GasBand::Transfer), 21_000);
    }

    #[test]
    fn test_gas_estimate_cost() {
        let info = GasTable::default().estimate(GasBand::Transfer);
        assert_eq!(info.gas_used, 21_000);
        assert_eq!(info.estimated_cost, dec("0.105"));
    }
}
