//! Helpers shared by the executors.

use serde_json::Value;

use plansim_contracts::{
    action::ExecutionAction,
    error::{EngineError, EngineResult},
    result::{ActionResult, ActionStatus},
    state::VirtualState,
};
use plansim_core::traits::Settlement;

/// Wrap a ledger settlement into the step's result.
pub(crate) fn settled(action: &ExecutionAction, settlement: Settlement, payload: Value) -> ActionResult {
    let result = match settlement.status {
        ActionStatus::Simulated => ActionResult::simulated(action.clone(), payload),
        ActionStatus::Pending => ActionResult::pending(action.clone(), payload),
        ActionStatus::Success => ActionResult::success(action.clone(), payload),
        ActionStatus::Error => {
            return ActionResult::error(action.clone(), "ledger reported a failed settlement")
        }
    };
    result.with_tx(settlement.tx_hash, settlement.gas)
}

/// True for a `0x`-prefixed hex string of at least one digit.
pub(crate) fn looks_like_address(s: &str) -> bool {
    s.len() > 2 && s.starts_with("0x") && s[2..].chars().all(|c| c.is_ascii_hexdigit())
}

/// A registry name resolves to its deployed contract's address; a raw
/// address passes through.
pub(crate) fn resolve_address(state: &VirtualState, name_or_address: &str) -> EngineResult<String> {
    if let Some(entry) = state.deployed_contract(name_or_address) {
        return Ok(entry.address.clone());
    }
    if looks_like_address(name_or_address) {
        return Ok(name_or_address.to_string());
    }
    Err(EngineError::ContractUnavailable {
        name: name_or_address.to_string(),
    })
}
