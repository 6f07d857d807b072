// SPDX-License-Identifier: MIT

//! Graph construction and compile-time validation

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use super::executor::CompiledGraph;
use super::types::{display_name, is_sentinel, Edge, END, START};
use crate::adk::error::{GraphError, ValidationIssue, ValidationReport};
use crate::procure::workflow::step::Step;

/// Builder for a workflow graph.
///
/// Nodes are registered by unique name, edges connect names (or the
/// `START`/`END` sentinels), and `compile` checks the whole structure at
/// once before handing back an executable graph.
pub struct StateGraph {
    nodes: HashMap<String, Arc<dyn Step>>,
    node_order: Vec<String>,
    edges: Vec<Edge>,
    entry_point: Option<String>,
    allow_fan_out: bool,
}

impl StateGraph {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            node_order: Vec::new(),
            edges: Vec::new(),
            entry_point: None,
            allow_fan_out: false,
        }
    }

    /// Accept nodes with more than one outgoing edge. The executor still
    /// follows only the first one.
    pub fn allow_fan_out(&mut self, allow: bool) -> &mut Self {
        self.allow_fan_out = allow;
        self
    }

    /// Register a step under a unique name
    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        step: Arc<dyn Step>,
    ) -> Result<(), GraphError> {
        let name = name.into();
        if is_sentinel(&name) {
            return Err(GraphError::ReservedName(name));
        }
        if self.nodes.contains_key(&name) {
            return Err(GraphError::DuplicateNode(name));
        }

        self.node_order.push(name.clone());
        self.nodes.insert(name, step);
        Ok(())
    }

    /// Record a directed transition. An edge from `START` sets the entry point.
    pub fn add_edge(&mut self, from: &str, to: &str) -> Result<(), GraphError> {
        let invalid = |reason: &str| GraphError::InvalidEdge {
            from: display_name(from).to_string(),
            to: display_name(to).to_string(),
            reason: reason.to_string(),
        };

        if from == END {
            return Err(invalid("END has no outgoing edges"));
        }
        if to == START {
            return Err(invalid("START cannot be a target"));
        }
        if from == START && to == END {
            return Err(invalid("START must lead to a node"));
        }
        for endpoint in [from, to] {
            if !is_sentinel(endpoint) && !self.nodes.contains_key(endpoint) {
                return Err(GraphError::UnknownNode(endpoint.to_string()));
            }
        }

        if from == START {
            return self.set_entry_point(to);
        }

        let edge = Edge::new(from, to);
        if self.edges.contains(&edge) {
            log::debug!("Ignoring repeated edge {}", edge);
            return Ok(());
        }
        self.edges.push(edge);
        Ok(())
    }

    /// Designate the unique start node
    pub fn set_entry_point(&mut self, name: &str) -> Result<(), GraphError> {
        if !self.nodes.contains_key(name) {
            return Err(GraphError::UnknownNode(name.to_string()));
        }

        match &self.entry_point {
            Some(existing) if existing != name => Err(GraphError::MultipleEntryPoints {
                existing: existing.clone(),
                requested: name.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                self.entry_point = Some(name.to_string());
                Ok(())
            }
        }
    }

    /// Registered node names in insertion order
    pub fn node_names(&self) -> &[String] {
        &self.node_order
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Validate the graph and return an executable handle
    pub fn compile(self) -> Result<CompiledGraph, GraphError> {
        let report = self.validate();
        if !report.is_empty() {
            log::error!("Graph validation failed: {}", report);
            return Err(GraphError::Validation(report));
        }

        // validate() reports a missing entry point, so this is always set here
        let entry = self
            .entry_point
            .ok_or_else(|| GraphError::Validation(ValidationReport::default()))?;

        Ok(CompiledGraph::new(
            self.nodes,
            self.node_order,
            self.edges,
            entry,
        ))
    }

    /// Collect every structural problem instead of stopping at the first
    fn validate(&self) -> ValidationReport {
        let mut issues = Vec::new();

        if self.node_order.is_empty() {
            issues.push(ValidationIssue::EmptyGraph);
            return ValidationReport { issues };
        }

        if self.entry_point.is_none() {
            issues.push(ValidationIssue::MissingEntryPoint);
        }

        let mut successors: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut predecessors: HashMap<&str, Vec<&str>> = HashMap::new();
        for edge in &self.edges {
            successors.entry(&edge.from).or_default().push(&edge.to);
            predecessors.entry(&edge.to).or_default().push(&edge.from);
        }

        for name in &self.node_order {
            match successors.get(name.as_str()) {
                None => issues.push(ValidationIssue::DeadEnd(name.clone())),
                Some(targets) if targets.len() > 1 && !self.allow_fan_out => {
                    issues.push(ValidationIssue::MultipleSuccessors {
                        node: name.clone(),
                        targets: targets.iter().map(|t| display_name(t).to_string()).collect(),
                    })
                }
                Some(_) => {}
            }
        }

        if let Some(entry) = &self.entry_point {
            let reachable = walk(entry, &successors);
            for name in &self.node_order {
                if !reachable.contains(name.as_str()) {
                    issues.push(ValidationIssue::Unreachable(name.clone()));
                }
            }
        }

        let reaches_end = walk(END, &predecessors);
        for name in &self.node_order {
            if successors.contains_key(name.as_str()) && !reaches_end.contains(name.as_str()) {
                issues.push(ValidationIssue::NeverReachesEnd(name.clone()));
            }
        }

        ValidationReport { issues }
    }
}

impl Default for StateGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Breadth-first walk over an adjacency map, including the start itself
fn walk<'a>(start: &'a str, adjacency: &HashMap<&'a str, Vec<&'a str>>) -> HashSet<&'a str> {
    let mut seen = HashSet::from([start]);
    let mut queue = VecDeque::from([start]);

    while let Some(current) = queue.pop_front() {
        for next in adjacency.get(current).into_iter().flatten() {
            if seen.insert(*next) {
                queue.push_back(*next);
            }
        }
    }
    seen
}
