//! Plan and run identity types.
//!
//! An `ExecutionPlan` is what a caller submits. It carries either an already
//! ordered `actions` list or a node/edge graph that the plan builder orders.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::action::ExecutionAction;

/// Where a plan's effects land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Against the in-memory virtual ledger only.
    Simulate,
    /// Against a live chain client.
    Execute,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Simulate => "simulate",
            ExecutionMode::Execute => "execute",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the runner does after a step returns `error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorPolicy {
    /// Keep dispatching; every problem ends up in the trace.
    ContinueOnError,
    /// Stop at the first failed step.
    FailFast,
}

/// Unique identifier for one run of a plan.
///
/// Every state entry and trace is keyed by this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub uuid::Uuid);

impl RunId {
    /// Create a new, unique run ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s).map(Self)
    }
}

/// A graph node: an action plus the id edges refer to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanNode {
    pub id: String,
    pub action: ExecutionAction,
}

impl PlanNode {
    pub fn new(id: impl Into<String>, action: ExecutionAction) -> Self {
        Self { id: id.into(), action }
    }
}

/// A dependency: `source` must run before `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEdge {
    pub source: String,
    pub target: String,
}

impl PlanEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// A declarative plan submitted for simulation or execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPlan {
    pub mode: ExecutionMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<String>,
    /// Pre-ordered steps. Ignored when `nodes` is non-empty.
    #[serde(default)]
    pub actions: Vec<ExecutionAction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<PlanNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edges: Vec<PlanEdge>,
    /// Caller-supplied metadata. The engine only forwards it.
    #[serde(default)]
    pub context: Map<String, Value>,
}

impl ExecutionPlan {
    /// A plan whose actions already run in the given order.
    pub fn new(mode: ExecutionMode, actions: Vec<ExecutionAction>) -> Self {
        Self {
            mode,
            plan_id: None,
            actions,
            nodes: Vec::new(),
            edges: Vec::new(),
            context: Map::new(),
        }
    }

    /// A plan whose order is derived from a dependency graph.
    pub fn from_graph(mode: ExecutionMode, nodes: Vec<PlanNode>, edges: Vec<PlanEdge>) -> Self {
        Self {
            mode,
            plan_id: None,
            actions: Vec::new(),
            nodes,
            edges,
            context: Map::new(),
        }
    }

    pub fn with_plan_id(mut self, plan_id: impl Into<String>) -> Self {
        self.plan_id = Some(plan_id.into());
        self
    }

    /// True when the plan is graph-shaped.
    pub fn is_graph(&self) -> bool {
        !self.nodes.is_empty()
    }

    /// Number of steps a run of this plan can record.
    pub fn action_count(&self) -> usize {
        if self.is_graph() {
            self.nodes.len()
        } else {
            self.actions.len()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.action_count() == 0
    }
}
