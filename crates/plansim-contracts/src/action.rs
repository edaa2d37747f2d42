//! The typed action vocabulary.
//!
//! An `ExecutionAction` is a closed tagged union keyed by the JSON `type`
//! field. Every variant carries only the fields its kind needs, and every
//! field is optional at the wire level: absence is reported by `validate()`
//! as a `MissingField` error rather than failing deserialization, so a
//! malformed step lands in the trace instead of rejecting the whole plan.
//!
//! Tags the engine does not know are kept as `Unsupported` so dispatch can
//! reject them by name.

use std::fmt;

use rust_decimal::Decimal;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{EngineError, EngineResult};

/// Discriminant for the known action kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    ReadBalance,
    X402Payment,
    ContractCall,
    ReadState,
    ApproveToken,
    Condition,
    LlmAgent,
    /// Reserved. No executor ships for it.
    Swap,
}

impl ActionKind {
    pub const ALL: [ActionKind; 8] = [
        ActionKind::ReadBalance,
        ActionKind::X402Payment,
        ActionKind::ContractCall,
        ActionKind::ReadState,
        ActionKind::ApproveToken,
        ActionKind::Condition,
        ActionKind::LlmAgent,
        ActionKind::Swap,
    ];

    /// The wire tag for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::ReadBalance => "read_balance",
            ActionKind::X402Payment => "x402_payment",
            ActionKind::ContractCall => "contract_call",
            ActionKind::ReadState => "read_state",
            ActionKind::ApproveToken => "approve_token",
            ActionKind::Condition => "condition",
            ActionKind::LlmAgent => "llm_agent",
            ActionKind::Swap => "swap",
        }
    }

    /// Resolve a wire tag. Returns `None` for tags outside the vocabulary.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.as_str() == tag)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Field helpers ─────────────────────────────────────────────────────────────

fn required_str<'a>(kind: ActionKind, field: &str, value: &'a Option<String>) -> EngineResult<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Err(EngineError::MissingField {
            kind: kind.to_string(),
            field: field.to_string(),
        }),
    }
}

fn positive_amount(kind: ActionKind, field: &str, value: &Option<Decimal>) -> EngineResult<Decimal> {
    let amount = value.ok_or_else(|| EngineError::MissingField {
        kind: kind.to_string(),
        field: field.to_string(),
    })?;
    if amount <= Decimal::ZERO {
        return Err(EngineError::InvalidField {
            kind: kind.to_string(),
            field: field.to_string(),
            reason: format!("must be greater than zero, got {amount}"),
        });
    }
    Ok(amount)
}

fn optional_str(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

// ── Variant payloads ──────────────────────────────────────────────────────────

/// Read one token balance from the run's wallet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadBalanceAction {
    /// Token symbol. Defaults to the native token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Informational; balances are always read from the run's own wallet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl ReadBalanceAction {
    pub fn token(&self) -> Option<&str> {
        optional_str(&self.token)
    }
}

/// An x402 value transfer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Free-form payment metadata carried into the result payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

impl PaymentAction {
    pub fn recipient(&self) -> EngineResult<&str> {
        required_str(ActionKind::X402Payment, "to", &self.to)
    }

    pub fn amount(&self) -> EngineResult<Decimal> {
        positive_amount(ActionKind::X402Payment, "amount", &self.amount)
    }

    pub fn token(&self) -> Option<&str> {
        optional_str(&self.token)
    }
}

/// A call against a named contract in the registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractCallAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Value>,
    /// Native value attached to the call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Decimal>,
}

impl ContractCallAction {
    pub fn contract(&self) -> EngineResult<&str> {
        required_str(ActionKind::ContractCall, "contract", &self.contract)
    }

    pub fn method(&self) -> EngineResult<&str> {
        required_str(ActionKind::ContractCall, "method", &self.method)
    }

    pub fn value(&self) -> EngineResult<Option<Decimal>> {
        match self.value {
            Some(v) if v < Decimal::ZERO => Err(EngineError::InvalidField {
                kind: ActionKind::ContractCall.to_string(),
                field: "value".to_string(),
                reason: format!("must not be negative, got {v}"),
            }),
            other => Ok(other),
        }
    }
}

/// Read a contract's registry entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadStateAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract: Option<String>,
}

impl ReadStateAction {
    pub fn contract(&self) -> EngineResult<&str> {
        required_str(ActionKind::ReadState, "contract", &self.contract)
    }
}

/// Grant a spender contract an allowance over a token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveTokenAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    /// The spender.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract: Option<String>,
}

impl ApproveTokenAction {
    pub fn token(&self) -> EngineResult<&str> {
        required_str(ActionKind::ApproveToken, "token", &self.token)
    }

    pub fn amount(&self) -> EngineResult<Decimal> {
        positive_amount(ActionKind::ApproveToken, "amount", &self.amount)
    }

    pub fn spender(&self) -> EngineResult<&str> {
        required_str(ActionKind::ApproveToken, "contract", &self.contract)
    }
}

/// A single-comparison guard over virtual state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    /// Name of the one state variable substituted into the expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
}

impl ConditionAction {
    pub fn expression(&self) -> EngineResult<&str> {
        required_str(ActionKind::Condition, "expression", &self.expression)
    }

    pub fn variable(&self) -> Option<&str> {
        optional_str(&self.variable)
    }
}

/// Ask the decision collaborator what to do next.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmAgentAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl LlmAgentAction {
    pub fn prompt(&self) -> EngineResult<&str> {
        required_str(ActionKind::LlmAgent, "prompt", &self.prompt)
    }
}

/// Reserved token swap. Parsed so it can be rejected by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
}

// ── ExecutionAction ───────────────────────────────────────────────────────────

/// One step of an execution plan.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionAction {
    ReadBalance(ReadBalanceAction),
    X402Payment(PaymentAction),
    ContractCall(ContractCallAction),
    ReadState(ReadStateAction),
    ApproveToken(ApproveTokenAction),
    Condition(ConditionAction),
    LlmAgent(LlmAgentAction),
    Swap(SwapAction),
    /// A tag outside the vocabulary, kept verbatim.
    Unsupported {
        kind: String,
        params: Map<String, Value>,
    },
}

impl ExecutionAction {
    /// The known kind, or `None` for `Unsupported`.
    pub fn kind(&self) -> Option<ActionKind> {
        match self {
            ExecutionAction::ReadBalance(_) => Some(ActionKind::ReadBalance),
            ExecutionAction::X402Payment(_) => Some(ActionKind::X402Payment),
            ExecutionAction::ContractCall(_) => Some(ActionKind::ContractCall),
            ExecutionAction::ReadState(_) => Some(ActionKind::ReadState),
            ExecutionAction::ApproveToken(_) => Some(ActionKind::ApproveToken),
            ExecutionAction::Condition(_) => Some(ActionKind::Condition),
            ExecutionAction::LlmAgent(_) => Some(ActionKind::LlmAgent),
            ExecutionAction::Swap(_) => Some(ActionKind::Swap),
            ExecutionAction::Unsupported { .. } => None,
        }
    }

    /// The wire tag, including tags the engine does not know.
    pub fn kind_name(&self) -> &str {
        match self {
            ExecutionAction::Unsupported { kind, .. } => kind,
            other => other.kind().map(|k| k.as_str()).unwrap_or_default(),
        }
    }

    /// Check that every field the kind requires is present and usable.
    ///
    /// `Swap` and `Unsupported` pass: they are rejected at dispatch with the
    /// unsupported-kind message instead.
    pub fn validate(&self) -> EngineResult<()> {
        match self {
            ExecutionAction::ReadBalance(_) => Ok(()),
            ExecutionAction::X402Payment(a) => {
                a.recipient()?;
                a.amount()?;
                Ok(())
            }
            ExecutionAction::ContractCall(a) => {
                a.contract()?;
                a.method()?;
                a.value()?;
                Ok(())
            }
            ExecutionAction::ReadState(a) => a.contract().map(|_| ()),
            ExecutionAction::ApproveToken(a) => {
                a.token()?;
                a.amount()?;
                a.spender()?;
                Ok(())
            }
            ExecutionAction::Condition(a) => a.expression().map(|_| ()),
            ExecutionAction::LlmAgent(a) => a.prompt().map(|_| ()),
            ExecutionAction::Swap(_) | ExecutionAction::Unsupported { .. } => Ok(()),
        }
    }

    /// Render as the tagged JSON object used on the wire.
    pub fn to_json(&self) -> Value {
        let body = match self {
            ExecutionAction::ReadBalance(a) => serde_json::to_value(a),
            ExecutionAction::X402Payment(a) => serde_json::to_value(a),
            ExecutionAction::ContractCall(a) => serde_json::to_value(a),
            ExecutionAction::ReadState(a) => serde_json::to_value(a),
            ExecutionAction::ApproveToken(a) => serde_json::to_value(a),
            ExecutionAction::Condition(a) => serde_json::to_value(a),
            ExecutionAction::LlmAgent(a) => serde_json::to_value(a),
            ExecutionAction::Swap(a) => serde_json::to_value(a),
            ExecutionAction::Unsupported { params, .. } => Ok(Value::Object(params.clone())),
        };

        let mut object = match body {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        object.insert("type".to_string(), Value::String(self.kind_name().to_string()));
        Value::Object(object)
    }

    /// Parse a tagged JSON object.
    ///
    /// Unknown tags become `Unsupported`; a missing tag or a body that does
    /// not fit its kind's shape is an `InvalidPlan` error.
    pub fn from_json(value: Value) -> EngineResult<Self> {
        let Value::Object(mut object) = value else {
            return Err(EngineError::InvalidPlan {
                reason: "action must be a JSON object".to_string(),
            });
        };

        let tag = match object.remove("type") {
            Some(Value::String(tag)) if !tag.trim().is_empty() => tag,
            _ => {
                return Err(EngineError::InvalidPlan {
                    reason: "action is missing its 'type' tag".to_string(),
                })
            }
        };

        let Some(kind) = ActionKind::from_tag(&tag) else {
            return Ok(ExecutionAction::Unsupported { kind: tag, params: object });
        };

        let body = Value::Object(object);
        let malformed = |e: serde_json::Error| EngineError::InvalidPlan {
            reason: format!("malformed {kind} action: {e}"),
        };

        let action = match kind {
            ActionKind::ReadBalance => {
                ExecutionAction::ReadBalance(serde_json::from_value(body).map_err(malformed)?)
            }
            ActionKind::X402Payment => {
                ExecutionAction::X402Payment(serde_json::from_value(body).map_err(malformed)?)
            }
            ActionKind::ContractCall => {
                ExecutionAction::ContractCall(serde_json::from_value(body).map_err(malformed)?)
            }
            ActionKind::ReadState => {
                ExecutionAction::ReadState(serde_json::from_value(body).map_err(malformed)?)
            }
            ActionKind::ApproveToken => {
                ExecutionAction::ApproveToken(serde_json::from_value(body).map_err(malformed)?)
            }
            ActionKind::Condition => {
                ExecutionAction::Condition(serde_json::from_value(body).map_err(malformed)?)
            }
            ActionKind::LlmAgent => {
                ExecutionAction::LlmAgent(serde_json::from_value(body).map_err(malformed)?)
            }
            ActionKind::Swap => {
                ExecutionAction::Swap(serde_json::from_value(body).map_err(malformed)?)
            }
        };
        Ok(action)
    }
}

impl Serialize for ExecutionAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ExecutionAction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        ExecutionAction::from_json(value).map_err(D::Error::custom)
    }
}
