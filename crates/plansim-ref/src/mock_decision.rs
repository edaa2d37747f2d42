//! Canned decision-query service.
//!
//! Answers are fixed strings; no model is consulted. `Offline` fails every
//! query the way a timed-out request would, which sends `llm_agent` down its
//! fallback path.

use std::sync::{Mutex, PoisonError};

use serde_json::Value;

use plansim_contracts::{
    client::DecisionResponse,
    error::{EngineError, EngineResult},
};
use plansim_core::traits::DecisionClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionMode {
    Approving,
    Declining,
    Offline,
}

pub struct MockDecisionClient {
    mode: DecisionMode,
    prompts: Mutex<Vec<String>>,
}

impl MockDecisionClient {
    pub fn new(mode: DecisionMode) -> Self {
        Self {
            mode,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far, including ones that failed.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl DecisionClient for MockDecisionClient {
    fn query(&self, prompt: &str, context: &Value) -> EngineResult<DecisionResponse> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(prompt.to_string());

        let address = context["address"].as_str().unwrap_or("the wallet");
        let response = match self.mode {
            DecisionMode::Approving => {
                format!("EXECUTE: {address} holds enough to cover the request")
            }
            DecisionMode::Declining => {
                format!("HOLD: spending from {address} is not advisable right now")
            }
            DecisionMode::Offline => {
                return Err(EngineError::Decision {
                    reason: "request timed out after 30s".to_string(),
                })
            }
        };

        Ok(DecisionResponse {
            response,
            execution_time_ms: 120,
        })
    }
}
