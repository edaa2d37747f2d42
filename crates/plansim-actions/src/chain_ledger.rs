//! Settlement through a live chain client.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use plansim_config::GasTable;
use plansim_contracts::{
    client::{TxReceipt, TxRequest},
    error::{EngineError, EngineResult},
    plan::ExecutionMode,
    result::{ActionStatus, GasInfo},
    state::ContractEntry,
};
use plansim_core::traits::{ActionContext, ChainClient, Ledger, Settlement};

/// The execute-mode `Ledger`.
///
/// Every operation is forwarded to the chain client; its errors surface
/// unchanged as step errors. A confirmed receipt settles as `success`, an
/// unconfirmed one as `pending`. Gas comes from the receipt, or from
/// `estimate_gas` when the receipt has none. Gas figures that cannot be
/// priced fail the step.
///
/// After a confirmed native transfer the run's native balance is reloaded
/// from the chain. Other tokens are deducted locally.
pub struct ChainLedger {
    chain: Arc<dyn ChainClient>,
    gas: GasTable,
}

impl ChainLedger {
    pub fn new(chain: Arc<dyn ChainClient>, gas: GasTable) -> Self {
        Self { chain, gas }
    }

    fn wallet_address(ctx: &ActionContext<'_>) -> String {
        ctx.state
            .get(ctx.run_id)
            .map(|s| s.wallet.address)
            .unwrap_or_default()
    }

    fn settle(&self, ctx: &ActionContext<'_>, receipt: TxReceipt, tx: TxRequest) -> EngineResult<Settlement> {
        let gas_used = if receipt.gas_used > 0 {
            receipt.gas_used
        } else {
            self.chain.estimate_gas(&tx)?
        };
        let price = receipt.gas_price_gwei.unwrap_or(self.gas.price_gwei);
        let gas = GasInfo::checked(gas_used, price).ok_or_else(|| EngineError::Chain {
            reason: format!("gas figures out of range: {gas_used} gas at {price} gwei"),
        })?;
        let status = if receipt.confirmed {
            ActionStatus::Success
        } else {
            ActionStatus::Pending
        };

        info!(
            run_id = %ctx.run_id,
            step = ctx.step_index,
            tx_hash = %receipt.tx_hash,
            confirmed = receipt.confirmed,
            gas_used,
            "chain settlement"
        );

        Ok(Settlement {
            status,
            tx_hash: receipt.tx_hash,
            gas,
        })
    }

    /// Bring the virtual ledger in line with a confirmed transfer.
    fn reconcile(&self, ctx: &ActionContext<'_>, amount: Decimal, token: &str) {
        if token == ctx.state.native_token() {
            if let Err(e) = ctx.state.load_from_chain(ctx.run_id, self.chain.as_ref()) {
                warn!(run_id = %ctx.run_id, error = %e, "balance reload after payment failed");
            }
        } else if !ctx.state.deduct(ctx.run_id, token, amount) {
            debug!(
                run_id = %ctx.run_id,
                token,
                "virtual balance below settled amount; left unchanged"
            );
        }
    }
}

impl Ledger for ChainLedger {
    fn mode(&self) -> ExecutionMode {
        ExecutionMode::Execute
    }

    fn transfer(
        &self,
        ctx: &ActionContext<'_>,
        to: &str,
        amount: Decimal,
        token: &str,
    ) -> EngineResult<Settlement> {
        let receipt = self.chain.send_payment(to, amount, token)?;
        let confirmed = receipt.confirmed;
        let tx = TxRequest {
            from: Self::wallet_address(ctx),
            to: to.to_string(),
            method: None,
            args: Vec::new(),
            value: Some(amount),
        };
        let settlement = self.settle(ctx, receipt, tx)?;

        if confirmed {
            self.reconcile(ctx, amount, token);
        }
        Ok(settlement)
    }

    fn call_contract(
        &self,
        ctx: &ActionContext<'_>,
        contract: &ContractEntry,
        method: &str,
        args: &[Value],
        value: Option<Decimal>,
    ) -> EngineResult<Settlement> {
        let receipt = self
            .chain
            .call_contract(&contract.address, method, args, value)?;
        let tx = TxRequest {
            from: Self::wallet_address(ctx),
            to: contract.address.clone(),
            method: Some(method.to_string()),
            args: args.to_vec(),
            value,
        };
        self.settle(ctx, receipt, tx)
    }

    /// Submitted as an `approve(spender, amount)` call on the token.
    fn approve(
        &self,
        ctx: &ActionContext<'_>,
        token: &str,
        spender: &str,
        amount: Decimal,
    ) -> EngineResult<Settlement> {
        let args = vec![json!(spender), json!(amount.to_string())];
        let receipt = self.chain.call_contract(token, "approve", &args, None)?;
        let tx = TxRequest {
            from: Self::wallet_address(ctx),
            to: token.to_string(),
            method: Some("approve".to_string()),
            args,
            value: None,
        };
        self.settle(ctx, receipt, tx)
    }
}
