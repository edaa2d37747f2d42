//! Kind → handler table.
//!
//! Built once at startup. `dispatch` is the only place a step turns into an
//! `ActionResult`: unknown kinds are rejected by name, required fields are
//! checked before the handler runs, and any `Err` becomes an `error` result
//! carrying the error's message.

use std::collections::HashMap;

use tracing::{debug, warn};

use plansim_contracts::{
    action::{ActionKind, ExecutionAction},
    error::{EngineError, EngineResult},
    result::ActionResult,
};

use crate::traits::{ActionContext, ActionExecutor};

/// Registered executors, one per kind.
#[derive(Default)]
pub struct ExecutorRegistry {
    handlers: HashMap<ActionKind, Box<dyn ActionExecutor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `executor` under its own kind, replacing any previous one.
    pub fn register(&mut self, executor: Box<dyn ActionExecutor>) {
        self.handlers.insert(executor.kind(), executor);
    }

    /// Builder-style `register`.
    pub fn with(mut self, executor: Box<dyn ActionExecutor>) -> Self {
        self.register(executor);
        self
    }

    pub fn get(&self, kind: ActionKind) -> Option<&dyn ActionExecutor> {
        self.handlers.get(&kind).map(|h| h.as_ref())
    }

    pub fn supports(&self, kind: ActionKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Registered kinds, sorted.
    pub fn kinds(&self) -> Vec<ActionKind> {
        let mut kinds: Vec<ActionKind> = self.handlers.keys().copied().collect();
        kinds.sort();
        kinds
    }

    fn resolve(&self, action: &ExecutionAction) -> EngineResult<&dyn ActionExecutor> {
        action
            .kind()
            .and_then(|kind| self.get(kind))
            .ok_or_else(|| EngineError::UnsupportedAction {
                kind: action.kind_name().to_string(),
            })
    }

    /// Run one action through its handler. Never fails: every problem is an
    /// `error` result.
    pub fn dispatch(&self, ctx: &ActionContext<'_>, action: &ExecutionAction) -> ActionResult {
        let outcome = self
            .resolve(action)
            .and_then(|executor| {
                action.validate()?;
                executor.execute(ctx, action)
            });

        match outcome {
            Ok(result) => {
                debug!(
                    run_id = %ctx.run_id,
                    step = ctx.step_index,
                    kind = %action.kind_name(),
                    status = ?result.status,
                    "step dispatched"
                );
                result
            }
            Err(e) => {
                warn!(
                    run_id = %ctx.run_id,
                    step = ctx.step_index,
                    kind = %action.kind_name(),
                    error = %e,
                    "step failed"
                );
                ActionResult::error(action.clone(), e.to_string())
            }
        }
    }
}
