//! `x402_payment`: a value transfer out of the run's wallet.

use serde_json::json;
use tracing::debug;

use plansim_contracts::{
    action::{ActionKind, ExecutionAction},
    error::{EngineError, EngineResult},
    result::ActionResult,
};
use plansim_core::traits::{ActionContext, ActionExecutor};

use crate::support::settled;

/// Settles through whichever ledger the run uses. An insufficient balance
/// fails the step and leaves the wallet untouched.
pub struct X402PaymentExecutor;

impl ActionExecutor for X402PaymentExecutor {
    fn kind(&self) -> ActionKind {
        ActionKind::X402Payment
    }

    fn execute(&self, ctx: &ActionContext<'_>, action: &ExecutionAction) -> EngineResult<ActionResult> {
        let ExecutionAction::X402Payment(payment) = action else {
            return Err(EngineError::UnsupportedAction {
                kind: action.kind_name().to_string(),
            });
        };

        let to = payment.recipient()?;
        let amount = payment.amount()?;
        let token = payment.token().unwrap_or(ctx.state.native_token());

        let previous = ctx.snapshot()?.balance(token);
        let settlement = ctx.ledger.transfer(ctx, to, amount, token)?;
        let new_balance = ctx.snapshot()?.balance(token).normalize();

        debug!(
            run_id = %ctx.run_id,
            step = ctx.step_index,
            token,
            previous = %previous,
            new_balance = %new_balance,
            "payment settled"
        );

        let mut payload = json!({
            "to": to,
            "amount": amount.normalize().to_string(),
            "token": token,
            "previousBalance": previous.normalize().to_string(),
            "newBalance": new_balance.to_string(),
        });
        if let Some(memo) = payment.memo.as_deref() {
            payload["memo"] = json!(memo);
        }

        Ok(settled(action, settlement, payload))
    }
}
