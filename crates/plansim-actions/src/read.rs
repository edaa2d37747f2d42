//! Zero-cost reads: `read_balance` and `read_state`.

use serde_json::json;

use plansim_contracts::{
    action::{ActionKind, ExecutionAction},
    error::{EngineError, EngineResult},
    result::ActionResult,
};
use plansim_core::traits::{ActionContext, ActionExecutor};

/// Balance of one token in the run's wallet. Defaults to the native token.
pub struct ReadBalanceExecutor;

impl ActionExecutor for ReadBalanceExecutor {
    fn kind(&self) -> ActionKind {
        ActionKind::ReadBalance
    }

    fn execute(&self, ctx: &ActionContext<'_>, action: &ExecutionAction) -> EngineResult<ActionResult> {
        let ExecutionAction::ReadBalance(read) = action else {
            return Err(EngineError::UnsupportedAction {
                kind: action.kind_name().to_string(),
            });
        };

        let state = ctx.snapshot()?;
        let token = read.token().unwrap_or(ctx.state.native_token());
        let balance = state.balance(token).normalize();

        Ok(ActionResult::success(
            action.clone(),
            json!({
                "balance": balance.to_string(),
                "token": token,
                "address": state.wallet.address,
            }),
        ))
    }
}

/// A contract's registry entry, deployed or not.
pub struct ReadStateExecutor;

impl ActionExecutor for ReadStateExecutor {
    fn kind(&self) -> ActionKind {
        ActionKind::ReadState
    }

    fn execute(&self, ctx: &ActionContext<'_>, action: &ExecutionAction) -> EngineResult<ActionResult> {
        let ExecutionAction::ReadState(read) = action else {
            return Err(EngineError::UnsupportedAction {
                kind: action.kind_name().to_string(),
            });
        };

        let name = read.contract()?;
        let state = ctx.snapshot()?;
        let entry = state
            .contracts
            .get(name)
            .ok_or_else(|| EngineError::ContractUnavailable {
                name: name.to_string(),
            })?;

        Ok(ActionResult::success(
            action.clone(),
            json!({
                "contract": name,
                "address": entry.address,
                "deployed": entry.deployed,
            }),
        ))
    }
}
