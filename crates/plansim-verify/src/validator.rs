//! Plan validator.
//!
//! Validation runs in two phases and never touches run state:
//!
//! 1. **Structural**: the raw document is checked against `plan_schema()`
//!    with the `jsonschema` crate. If it fails, the report stops there.
//! 2. **Semantic**: every action is parsed and checked on its own, so one
//!    bad step does not hide the others. Graph plans are also ordered and
//!    any ordering anomaly (cycle, unconnected node, duplicate id, dangling
//!    edge) becomes a warning.
//!
//! All findings are accumulated before returning.

use serde_json::Value;
use tracing::{debug, warn};

use plansim_contracts::{
    action::{ActionKind, ExecutionAction},
    error::{EngineError, EngineResult},
    plan::{ExecutionPlan, PlanEdge, PlanNode},
    validate::ValidationReport,
};
use plansim_core::builder::PlanBuilder;

use crate::schema::plan_schema;

pub struct PlanValidator {
    schema: jsonschema::Validator,
    supported: Vec<ActionKind>,
}

impl PlanValidator {
    /// A validator that accepts every kind except the reserved `swap`.
    pub fn new() -> EngineResult<Self> {
        let supported = ActionKind::ALL
            .into_iter()
            .filter(|k| *k != ActionKind::Swap)
            .collect();
        Self::with_supported(supported)
    }

    /// A validator that accepts exactly `supported`, typically the kinds of
    /// the registry the plan will run against.
    pub fn with_supported(supported: Vec<ActionKind>) -> EngineResult<Self> {
        let schema = jsonschema::validator_for(&plan_schema()).map_err(|e| {
            EngineError::SchemaValidation {
                reason: format!("invalid plan schema: {e}"),
            }
        })?;
        Ok(Self { schema, supported })
    }

    /// Validate a raw plan document.
    pub fn validate_json(&self, document: &Value) -> ValidationReport {
        let structural: Vec<String> = self
            .schema
            .iter_errors(document)
            .map(|error| {
                let path = error.instance_path.to_string();
                let at = if path.is_empty() { "/".to_string() } else { path };
                format!("schema violation at {at}: {error}")
            })
            .collect();

        if !structural.is_empty() {
            warn!(errors = structural.len(), "plan failed structural validation");
            return ValidationReport::from_findings(structural, Vec::new());
        }

        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let actions = array(document, "actions");
        let nodes = array(document, "nodes");
        let edges = array(document, "edges");

        if actions.is_empty() && nodes.is_empty() {
            errors.push(EngineError::EmptyPlan.to_string());
        }
        if !actions.is_empty() && !nodes.is_empty() {
            warnings.push("plan has both actions and nodes; actions are ignored".to_string());
        }

        for (i, raw) in actions.iter().enumerate() {
            if let Err(message) = self.check_action(raw.clone()) {
                errors.push(format!("actions[{i}]: {message}"));
            }
        }

        let mut parsed_nodes = Vec::with_capacity(nodes.len());
        for (i, raw) in nodes.iter().enumerate() {
            let id = raw["id"].as_str().unwrap_or_default().to_string();
            match self.check_action(raw["action"].clone()) {
                Ok(action) => parsed_nodes.push(PlanNode::new(id, action)),
                Err(message) => {
                    errors.push(format!("nodes[{i}] ({id}): {message}"));
                    if let Ok(action) = ExecutionAction::from_json(raw["action"].clone()) {
                        parsed_nodes.push(PlanNode::new(id, action));
                    }
                }
            }
        }

        if !parsed_nodes.is_empty() {
            let parsed_edges: Vec<PlanEdge> = edges
                .iter()
                .map(|e| {
                    PlanEdge::new(
                        e["source"].as_str().unwrap_or_default(),
                        e["target"].as_str().unwrap_or_default(),
                    )
                })
                .collect();
            warnings.extend(graph_warnings(&parsed_nodes, &parsed_edges));
        } else if !edges.is_empty() {
            warnings.push("edges are ignored for a plan without nodes".to_string());
        }

        let report = ValidationReport::from_findings(errors, warnings);
        debug!(
            valid = report.valid,
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            "plan validated"
        );
        report
    }

    /// Validate an already-parsed plan. Only the semantic phase applies.
    pub fn validate_plan(&self, plan: &ExecutionPlan) -> ValidationReport {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if plan.is_empty() {
            errors.push(EngineError::EmptyPlan.to_string());
        }

        if plan.is_graph() {
            if !plan.actions.is_empty() {
                warnings.push("plan has both actions and nodes; actions are ignored".to_string());
            }
            for (i, node) in plan.nodes.iter().enumerate() {
                if let Err(message) = self.check_parsed(&node.action) {
                    errors.push(format!("nodes[{i}] ({}): {message}", node.id));
                }
            }
            warnings.extend(graph_warnings(&plan.nodes, &plan.edges));
        } else {
            for (i, action) in plan.actions.iter().enumerate() {
                if let Err(message) = self.check_parsed(action) {
                    errors.push(format!("actions[{i}]: {message}"));
                }
            }
        }

        ValidationReport::from_findings(errors, warnings)
    }

    fn check_action(&self, raw: Value) -> Result<ExecutionAction, String> {
        let action = ExecutionAction::from_json(raw).map_err(|e| e.to_string())?;
        self.check_parsed(&action)?;
        Ok(action)
    }

    fn check_parsed(&self, action: &ExecutionAction) -> Result<(), String> {
        let supported = action.kind().is_some_and(|k| self.supported.contains(&k));
        if !supported {
            return Err(EngineError::UnsupportedAction {
                kind: action.kind_name().to_string(),
            }
            .to_string());
        }
        action.validate().map_err(|e| e.to_string())
    }
}

fn array<'a>(document: &'a Value, key: &str) -> &'a [Value] {
    document
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn graph_warnings(nodes: &[PlanNode], edges: &[PlanEdge]) -> Vec<String> {
    PlanBuilder::order(nodes, edges).warnings(edges.len())
}
