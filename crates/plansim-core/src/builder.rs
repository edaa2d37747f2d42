//! Deterministic plan ordering.
//!
//! `PlanBuilder::order` runs Kahn's algorithm over the node/edge graph.
//! Seeds are the zero in-degree nodes that some edge mentions, in
//! declaration order, and the queue is FIFO, so identical input always gives
//! identical output.
//!
//! Nodes that never reach zero in-degree (they sit on or behind a cycle) and
//! nodes no edge mentions are appended after the sorted prefix in declaration
//! order. Nothing is dropped and nothing is raised: every input node appears
//! exactly once. The anomalies are reported alongside the order so callers
//! can surface them as warnings.

use std::collections::{HashMap, VecDeque};

use tracing::debug;

use plansim_contracts::{
    action::ExecutionAction,
    plan::{PlanEdge, PlanNode},
};

/// The ordered steps plus whatever looked wrong with the graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderedPlan {
    /// Node ids in execution order.
    pub node_ids: Vec<String>,
    /// Actions in execution order, parallel to `node_ids`.
    pub actions: Vec<ExecutionAction>,
    /// Nodes appended because they never reached zero in-degree.
    pub cyclic: Vec<String>,
    /// Nodes appended because no edge mentions them.
    pub unconnected: Vec<String>,
    /// Ids declared more than once. Later copies are treated as unconnected.
    pub duplicate_ids: Vec<String>,
    /// Edges naming a node id that does not exist. They are ignored.
    pub dangling_edges: Vec<PlanEdge>,
}

impl OrderedPlan {
    /// Human-readable warnings for every anomaly, in a stable order.
    ///
    /// Unconnected nodes are only worth a warning when the plan has edges at
    /// all; an edge-less graph is just a declaration-ordered list.
    pub fn warnings(&self, edge_count: usize) -> Vec<String> {
        let mut warnings = Vec::new();
        if !self.cyclic.is_empty() {
            warnings.push(format!(
                "dependency cycle detected; node(s) {} appended in declaration order",
                self.cyclic.join(", ")
            ));
        }
        if edge_count > 0 && !self.unconnected.is_empty() {
            warnings.push(format!(
                "node(s) {} are not connected to any edge; appended in declaration order",
                self.unconnected.join(", ")
            ));
        }
        for id in &self.duplicate_ids {
            warnings.push(format!("node id '{id}' is declared more than once"));
        }
        for edge in &self.dangling_edges {
            warnings.push(format!(
                "edge {} -> {} references an unknown node and was ignored",
                edge.source, edge.target
            ));
        }
        warnings
    }

    pub fn has_anomalies(&self) -> bool {
        !self.cyclic.is_empty()
            || !self.unconnected.is_empty()
            || !self.duplicate_ids.is_empty()
            || !self.dangling_edges.is_empty()
    }
}

/// Turns a plan graph into a linear action sequence.
pub struct PlanBuilder;

impl PlanBuilder {
    /// Order `nodes` so that every edge's source precedes its target.
    pub fn order(nodes: &[PlanNode], edges: &[PlanEdge]) -> OrderedPlan {
        let count = nodes.len();
        let mut result = OrderedPlan::default();

        // First declaration of an id wins; edges resolve against it.
        let mut index_of: HashMap<&str, usize> = HashMap::with_capacity(count);
        let mut duplicate = vec![false; count];
        for (i, node) in nodes.iter().enumerate() {
            if index_of.contains_key(node.id.as_str()) {
                duplicate[i] = true;
                result.duplicate_ids.push(node.id.clone());
            } else {
                index_of.insert(node.id.as_str(), i);
            }
        }

        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); count];
        let mut in_degree = vec![0usize; count];
        let mut mentioned = vec![false; count];

        for edge in edges {
            match (
                index_of.get(edge.source.as_str()),
                index_of.get(edge.target.as_str()),
            ) {
                (Some(&source), Some(&target)) => {
                    adjacency[source].push(target);
                    in_degree[target] += 1;
                    mentioned[source] = true;
                    mentioned[target] = true;
                }
                _ => result.dangling_edges.push(edge.clone()),
            }
        }

        let mut queue: VecDeque<usize> = (0..count)
            .filter(|&i| mentioned[i] && in_degree[i] == 0)
            .collect();
        let mut placed = vec![false; count];
        let mut order: Vec<usize> = Vec::with_capacity(count);

        while let Some(current) = queue.pop_front() {
            placed[current] = true;
            order.push(current);
            for &next in &adjacency[current] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    queue.push_back(next);
                }
            }
        }

        for i in 0..count {
            if placed[i] {
                continue;
            }
            order.push(i);
            if mentioned[i] {
                result.cyclic.push(nodes[i].id.clone());
            } else if !duplicate[i] {
                result.unconnected.push(nodes[i].id.clone());
            }
        }

        debug!(
            nodes = count,
            edges = edges.len(),
            sorted = count - result.cyclic.len() - result.unconnected.len() - result.duplicate_ids.len(),
            cyclic = result.cyclic.len(),
            "plan ordered"
        );

        result.node_ids = order.iter().map(|&i| nodes[i].id.clone()).collect();
        result.actions = order.iter().map(|&i| nodes[i].action.clone()).collect();
        result
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
