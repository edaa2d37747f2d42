//! Registry-backed contract actions: `contract_call` and `approve_token`.

use serde_json::{json, Value};

use plansim_contracts::{
    action::{ActionKind, ExecutionAction},
    error::{EngineError, EngineResult},
    plan::ExecutionMode,
    result::{ActionResult, ActionStatus},
};
use plansim_core::traits::{ActionContext, ActionExecutor};

use crate::support::{resolve_address, settled};

/// Calls a named contract. The contract must be in the run's registry and
/// deployed.
pub struct ContractCallExecutor;

impl ActionExecutor for ContractCallExecutor {
    fn kind(&self) -> ActionKind {
        ActionKind::ContractCall
    }

    fn execute(&self, ctx: &ActionContext<'_>, action: &ExecutionAction) -> EngineResult<ActionResult> {
        let ExecutionAction::ContractCall(call) = action else {
            return Err(EngineError::UnsupportedAction {
                kind: action.kind_name().to_string(),
            });
        };

        let name = call.contract()?;
        let method = call.method()?;
        let value = call.value()?;

        let state = ctx.snapshot()?;
        let entry = state
            .deployed_contract(name)
            .cloned()
            .ok_or_else(|| EngineError::ContractUnavailable {
                name: name.to_string(),
            })?;

        let settlement = ctx
            .ledger
            .call_contract(ctx, &entry, method, &call.args, value)?;

        let mut payload = json!({
            "contract": name,
            "address": entry.address,
            "method": method,
            "args": Value::Array(call.args.clone()),
        });
        if let Some(value) = value {
            payload["value"] = json!(value.normalize().to_string());
        }

        Ok(settled(action, settlement, payload))
    }
}

/// Grants a spender an allowance.
///
/// Token and spender may be registry names or raw addresses. A live run
/// rejects anything that resolves to neither. On the virtual ledger names
/// pass through unresolved, no allowance is recorded and the step only
/// prices the approval.
pub struct ApproveTokenExecutor;

impl ActionExecutor for ApproveTokenExecutor {
    fn kind(&self) -> ActionKind {
        ActionKind::ApproveToken
    }

    fn execute(&self, ctx: &ActionContext<'_>, action: &ExecutionAction) -> EngineResult<ActionResult> {
        let ExecutionAction::ApproveToken(approve) = action else {
            return Err(EngineError::UnsupportedAction {
                kind: action.kind_name().to_string(),
            });
        };

        let token = approve.token()?;
        let amount = approve.amount()?;
        let spender = approve.spender()?;

        let state = ctx.snapshot()?;
        let (token_address, spender_address) = match ctx.mode {
            ExecutionMode::Execute => (
                resolve_address(&state, token)?,
                resolve_address(&state, spender)?,
            ),
            ExecutionMode::Simulate => (
                resolve_address(&state, token).unwrap_or_else(|_| token.to_string()),
                resolve_address(&state, spender).unwrap_or_else(|_| spender.to_string()),
            ),
        };

        let settlement = ctx
            .ledger
            .approve(ctx, &token_address, &spender_address, amount)?;
        let tracked = settlement.status != ActionStatus::Simulated;

        Ok(settled(
            action,
            settlement,
            json!({
                "token": token,
                "amount": amount.normalize().to_string(),
                "spender": spender,
                "spenderAddress": spender_address,
                "allowanceTracked": tracked,
            }),
        ))
    }
}
