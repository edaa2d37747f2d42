//! `llm_agent`: ask the decision collaborator, fall back to a heuristic.
//!
//! Two paths. The primary path sends the prompt and the wallet context to
//! the `DecisionClient`. If there is no client, or the query fails for any
//! reason, the fallback path answers from the native balance alone:
//!
//! - execute only when the balance is above `threshold`
//! - recommend `min(balance * fraction, cap)`
//!
//! The step succeeds either way; fallback results carry `fallback: true`.

use rust_decimal::Decimal;
use serde_json::{json, Value};
use tracing::{debug, warn};

use plansim_config::DecisionConfig;
use plansim_contracts::{
    action::{ActionKind, ExecutionAction, LlmAgentAction},
    client::DecisionResponse,
    error::{EngineError, EngineResult},
    result::ActionResult,
    state::VirtualState,
};
use plansim_core::traits::{ActionContext, ActionExecutor};

/// What the heuristic recommends.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackDecision {
    pub execute: bool,
    pub recommended_amount: Decimal,
}

pub struct LlmAgentExecutor {
    tuning: DecisionConfig,
}

impl LlmAgentExecutor {
    pub fn new(tuning: DecisionConfig) -> Self {
        Self { tuning }
    }

    pub fn fallback(&self, balance: Decimal) -> FallbackDecision {
        if balance <= self.tuning.threshold {
            return FallbackDecision {
                execute: false,
                recommended_amount: Decimal::ZERO,
            };
        }
        FallbackDecision {
            execute: true,
            recommended_amount: (balance * self.tuning.fraction)
                .min(self.tuning.cap)
                .normalize(),
        }
    }

    fn wallet_context(
        agent: &LlmAgentAction,
        state: &VirtualState,
        native_token: &str,
    ) -> Value {
        json!({
            "address": state.wallet.address,
            "nativeToken": native_token,
            "balances": state.wallet.balances,
            "mode": state.mode,
            "model": agent.model,
            "context": agent.context,
        })
    }

    fn primary(
        ctx: &ActionContext<'_>,
        prompt: &str,
        wallet: &Value,
    ) -> EngineResult<DecisionResponse> {
        let client = ctx.decision.ok_or_else(|| EngineError::Decision {
            reason: "no decision client configured".to_string(),
        })?;
        client.query(prompt, wallet)
    }
}

impl ActionExecutor for LlmAgentExecutor {
    fn kind(&self) -> ActionKind {
        ActionKind::LlmAgent
    }

    fn execute(&self, ctx: &ActionContext<'_>, action: &ExecutionAction) -> EngineResult<ActionResult> {
        let ExecutionAction::LlmAgent(agent) = action else {
            return Err(EngineError::UnsupportedAction {
                kind: action.kind_name().to_string(),
            });
        };

        let prompt = agent.prompt()?;
        let state = ctx.snapshot()?;
        let native_token = ctx.state.native_token();
        let wallet = Self::wallet_context(agent, &state, native_token);

        match Self::primary(ctx, prompt, &wallet) {
            Ok(answer) => {
                debug!(
                    run_id = %ctx.run_id,
                    step = ctx.step_index,
                    execution_time_ms = answer.execution_time_ms,
                    "decision received"
                );
                Ok(ActionResult::success(
                    action.clone(),
                    json!({
                        "response": answer.response,
                        "executionTimeMs": answer.execution_time_ms,
                        "model": agent.model,
                        "fallback": false,
                    }),
                ))
            }
            Err(e) => {
                let balance = state.balance(native_token).normalize();
                let decision = self.fallback(balance);
                warn!(
                    run_id = %ctx.run_id,
                    step = ctx.step_index,
                    error = %e,
                    execute = decision.execute,
                    "decision client unavailable; using fallback heuristic"
                );

                let response = if decision.execute {
                    format!(
                        "Fallback: execute with {} {native_token} (balance {balance})",
                        decision.recommended_amount
                    )
                } else {
                    format!("Fallback: hold, balance {balance} {native_token} is below threshold")
                };

                Ok(ActionResult::success(
                    action.clone(),
                    json!({
                        "response": response,
                        "fallback": true,
                        "reason": e.to_string(),
                        "decision": {
                            "execute": decision.execute,
                            "recommendedAmount": decision.recommended_amount.to_string(),
                            "token": native_token,
                            "balance": balance.to_string(),
                        },
                    }),
                ))
            }
        }
    }
}
