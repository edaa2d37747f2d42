//! # plansim-state
//!
//! The per-run virtual ledger of the plansim engine.
//!
//! ## Overview
//!
//! [`VirtualStateStore`] implements
//! [`StateStore`](plansim_core::traits::StateStore). Each run gets its own
//! wallet, seeded from the configured balances for its mode, and its own copy
//! of the well-known contract registry. Runs never see each other's state.
//!
//! `deduct` is the one operation that can refuse: it returns `false` and
//! leaves the balance alone when funds are short. Nothing here panics or
//! errors on an unknown run.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use plansim_state::VirtualStateStore;
//! use plansim_core::traits::StateStore;
//!
//! let store = VirtualStateStore::from_config(&config);
//! store.create(run_id, ExecutionMode::Simulate, "0xagent");
//! assert!(store.deduct(&run_id, "TCRO", dec!(0.5)));
//! ```

pub mod store;

pub use store::VirtualStateStore;

// ── Tests ─────────────────────────────────────────────────────────────────────
