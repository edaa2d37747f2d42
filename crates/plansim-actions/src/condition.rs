//! `condition`: a single numeric comparison over the run's state.
//!
//! Accepted shape: `<operand> <op> <operand>` where `op` is `>`, `<` or
//! `==` and each operand is a decimal literal or a state variable. At most
//! one operand may be a variable. Variables:
//!
//! - `balance`: the native token balance
//! - `balance.<TOKEN>`: the balance of `<TOKEN>`
//! - `<TOKEN>`: a bare symbol the wallet holds
//!
//! Anything else (other operators, arithmetic, two variables, an unknown
//! name) evaluates to `false` with `supported: false` in the payload. The
//! step itself still succeeds.

use std::str::FromStr;

use regex::Regex;
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{debug, warn};

use plansim_contracts::{
    action::{ActionKind, ExecutionAction},
    error::{EngineError, EngineResult},
    result::ActionResult,
    state::VirtualState,
};
use plansim_core::traits::{ActionContext, ActionExecutor};

const OPERAND: &str = r"(-?\d+(?:\.\d+)?|[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z0-9_]+)?)";

/// Outcome of one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// The expression after variable substitution.
    pub substituted: String,
    pub variable: Option<String>,
    pub value: Option<Decimal>,
    pub result: bool,
    pub supported: bool,
}

impl Evaluation {
    fn unsupported(expression: &str) -> Self {
        Self {
            substituted: expression.to_string(),
            variable: None,
            value: None,
            result: false,
            supported: false,
        }
    }
}

pub struct ConditionExecutor {
    comparison: Regex,
}

impl ConditionExecutor {
    pub fn new() -> EngineResult<Self> {
        let pattern = format!(r"^\s*{OPERAND}\s*(==|>|<)\s*{OPERAND}\s*$");
        let comparison = Regex::new(&pattern).map_err(|e| EngineError::ConfigError {
            reason: format!("failed to compile condition pattern: {e}"),
        })?;
        Ok(Self { comparison })
    }

    /// Evaluate `expression` against `state`.
    ///
    /// `declared` restricts substitution to that one name when given.
    pub fn evaluate(
        &self,
        expression: &str,
        declared: Option<&str>,
        state: &VirtualState,
        native_token: &str,
    ) -> Evaluation {
        let Some(caps) = self.comparison.captures(expression) else {
            return Evaluation::unsupported(expression);
        };
        let (lhs, op, rhs) = (&caps[1], &caps[2], &caps[3]);

        let mut variable: Option<(String, Decimal)> = None;
        let mut resolve = |operand: &str| -> Option<Decimal> {
            if let Ok(literal) = Decimal::from_str(operand) {
                return Some(literal);
            }
            if variable.is_some() || declared.is_some_and(|d| d != operand) {
                return None;
            }
            let value = lookup(operand, state, native_token)?;
            variable = Some((operand.to_string(), value));
            Some(value)
        };

        let (Some(left), Some(right)) = (resolve(lhs), resolve(rhs)) else {
            return Evaluation::unsupported(expression);
        };

        let result = match op {
            ">" => left > right,
            "<" => left < right,
            _ => left == right,
        };

        Evaluation {
            substituted: format!("{} {op} {}", left.normalize(), right.normalize()),
            variable: variable.as_ref().map(|(name, _)| name.clone()),
            value: variable.map(|(_, value)| value.normalize()),
            result,
            supported: true,
        }
    }
}

fn lookup(name: &str, state: &VirtualState, native_token: &str) -> Option<Decimal> {
    if name == "balance" {
        return Some(state.balance(native_token));
    }
    if let Some(token) = name.strip_prefix("balance.") {
        return Some(state.balance(token));
    }
    state.wallet.balances.get(name).copied()
}

impl ActionExecutor for ConditionExecutor {
    fn kind(&self) -> ActionKind {
        ActionKind::Condition
    }

    fn execute(&self, ctx: &ActionContext<'_>, action: &ExecutionAction) -> EngineResult<ActionResult> {
        let ExecutionAction::Condition(condition) = action else {
            return Err(EngineError::UnsupportedAction {
                kind: action.kind_name().to_string(),
            });
        };

        let expression = condition.expression()?;
        let state = ctx.snapshot()?;
        let evaluation = self.evaluate(
            expression,
            condition.variable(),
            &state,
            ctx.state.native_token(),
        );

        if evaluation.supported {
            debug!(
                run_id = %ctx.run_id,
                step = ctx.step_index,
                expression = %evaluation.substituted,
                result = evaluation.result,
                "condition evaluated"
            );
        } else {
            warn!(
                run_id = %ctx.run_id,
                step = ctx.step_index,
                expression,
                "unsupported condition; evaluating to false"
            );
        }

        let mut payload = json!({
            "expression": expression,
            "evaluated": evaluation.substituted,
            "result": evaluation.result,
            "supported": evaluation.supported,
        });
        if let (Some(name), Some(value)) = (&evaluation.variable, evaluation.value) {
            payload["variable"] = json!(name);
            payload["value"] = json!(value.to_string());
        }

        Ok(ActionResult::success(action.clone(), payload))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::str::FromStr;

    use chrono::Utc;
    use rust_decimal::Decimal;

    use plansim_contracts::{
        plan::{ExecutionMode, RunId},
        state::{VirtualState, Wallet},
    };

    use super::ConditionExecutor;

    fn state() -> VirtualState {
        VirtualState {
            run_id: RunId::new(),
            mode: ExecutionMode::Simulate,
            wallet: Wallet {
                address: "0xagent".to_string(),
                balances: BTreeMap::from([
                    ("TCRO".to_string(), Decimal::from(10)),
                    ("USDC".to_string(), Decimal::from_str("99.5").unwrap()),
                ]),
                nonce: None,
            },
            contracts: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    fn eval(expr: &str, declared: Option<&str>) -> (bool, bool) {
        let e = ConditionExecutor::new()
            .unwrap()
            .evaluate(expr, declared, &state(), "TCRO");
        (e.result, e.supported)
    }

    #[test]
    fn literal_comparisons() {
        assert_eq!(eval("5 > 3", None), (true, true));
        assert_eq!(eval("5 < 3", None), (false, true));
        assert_eq!(eval("2.50 == 2.5", None), (true, true));
        assert_eq!(eval("-1 < 0", None), (true, true));
    }

    #[test]
    fn variables_resolve_from_state() {
        assert_eq!(eval("balance > 5", None), (true, true));
        assert_eq!(eval("balance.USDC < 100", None), (true, true));
        assert_eq!(eval("USDC == 99.5", None), (true, true));
        assert_eq!(eval("1 < balance", Some("balance")), (true, true));
        assert_eq!(eval("balance.WETH == 0", None), (true, true));
    }

    #[test]
    fn substitution_is_recorded() {
        let e = ConditionExecutor::new()
            .unwrap()
            .evaluate("balance > 0.5", Some("balance"), &state(), "TCRO");
        assert_eq!(e.substituted, "10 > 0.5");
        assert_eq!(e.variable.as_deref(), Some("balance"));
        assert_eq!(e.value, Some(Decimal::from(10)));
    }

    /// Shapes outside the single-comparison grammar are false, not errors.
    #[test]
    fn unsupported_shapes_degrade_to_false() {
        for expr in [
            "balance >= 5",
            "balance != 5",
            "balance + 1 > 5",
            "balance > USDC",
            "unknown_name > 1",
            "1 > 0 && 2 > 1",
            "drop_tables()",
            "",
        ] {
            assert_eq!(eval(expr, None), (false, false), "{expr:?}");
        }
    }

    #[test]
    fn declared_variable_restricts_substitution() {
        assert_eq!(eval("USDC > 1", Some("balance")), (false, false));
    }
}
