//! Settlement against the per-run virtual ledger only.

use rust_decimal::Decimal;
use serde_json::Value;
use tracing::debug;

use plansim_config::{GasBand, GasTable};
use plansim_contracts::{
    error::{EngineError, EngineResult},
    plan::ExecutionMode,
    result::ActionStatus,
    state::ContractEntry,
};
use plansim_core::traits::{ActionContext, Ledger, Settlement};

use crate::hash::simulated_tx_hash;

/// The simulate-mode `Ledger`.
///
/// Transfers are checked against the run's balance and deducted from it.
/// Every settlement is `simulated`, carries a synthetic hash, and is priced
/// from the gas table. Approvals are accepted without tracking an allowance.
#[derive(Debug, Clone, Default)]
pub struct VirtualLedger {
    gas: GasTable,
}

impl VirtualLedger {
    pub fn new(gas: GasTable) -> Self {
        Self { gas }
    }

    fn settle(&self, ctx: &ActionContext<'_>, band: GasBand, descriptor: String) -> Settlement {
        let tx_hash = simulated_tx_hash(ctx.run_id, ctx.step_index, &descriptor);
        debug!(
            run_id = %ctx.run_id,
            step = ctx.step_index,
            tx_hash = %tx_hash,
            "virtual settlement"
        );
        Settlement {
            status: ActionStatus::Simulated,
            tx_hash,
            gas: self.gas.estimate(band),
        }
    }

    /// Check then deduct. Nothing changes when funds are short.
    fn debit(&self, ctx: &ActionContext<'_>, token: &str, amount: Decimal) -> EngineResult<()> {
        let insufficient = |available: Decimal| EngineError::InsufficientFunds {
            token: token.to_string(),
            available,
            required: amount,
        };

        let available = ctx.snapshot()?.balance(token);
        if available < amount {
            return Err(insufficient(available));
        }
        if !ctx.state.deduct(ctx.run_id, token, amount) {
            let available = ctx.snapshot()?.balance(token);
            return Err(insufficient(available));
        }
        Ok(())
    }
}

impl Ledger for VirtualLedger {
    fn mode(&self) -> ExecutionMode {
        ExecutionMode::Simulate
    }

    fn transfer(
        &self,
        ctx: &ActionContext<'_>,
        to: &str,
        amount: Decimal,
        token: &str,
    ) -> EngineResult<Settlement> {
        self.debit(ctx, token, amount)?;

        let band = if token == ctx.state.native_token() {
            GasBand::Transfer
        } else {
            GasBand::TransferLike
        };
        Ok(self.settle(ctx, band, format!("transfer:{to}:{amount}:{token}")))
    }

    fn call_contract(
        &self,
        ctx: &ActionContext<'_>,
        contract: &ContractEntry,
        method: &str,
        args: &[Value],
        value: Option<Decimal>,
    ) -> EngineResult<Settlement> {
        if let Some(value) = value.filter(|v| !v.is_zero()) {
            self.debit(ctx, ctx.state.native_token(), value)?;
        }

        let band = self.gas.band_for_method(method);
        let args = Value::Array(args.to_vec());
        Ok(self.settle(
            ctx,
            band,
            format!("call:{}:{method}:{args}", contract.address),
        ))
    }

    fn approve(
        &self,
        ctx: &ActionContext<'_>,
        token: &str,
        spender: &str,
        amount: Decimal,
    ) -> EngineResult<Settlement> {
        Ok(self.settle(
            ctx,
            GasBand::Approve,
            format!("approve:{token}:{spender}:{amount}"),
        ))
    }
}
