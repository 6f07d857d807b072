//! Graph workflow executor

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use super::types::{display_name, Edge, END};
use crate::adk::error::{ProcureError, StateError};
use crate::procure::workflow::state::{ProcurementState, StepStatus};
use crate::procure::workflow::step::Step;

/// What the executor does after a step ends in `failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop the chain at the failed step (default)
    #[default]
    Halt,
    /// Keep walking; later steps see the failure in the state
    Continue,
}

impl FromStr for FailurePolicy {
    type Err = ProcureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "halt" => Ok(FailurePolicy::Halt),
            "continue" => Ok(FailurePolicy::Continue),
            other => Err(ProcureError::config(format!(
                "unknown failure policy '{}', expected 'halt' or 'continue'",
                other
            ))),
        }
    }
}

/// Trace entry for one visited node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeRecord {
    pub node: String,
    pub status: StepStatus,
    /// The step short-circuited on a pre-existing status
    pub skipped: bool,
    pub elapsed_ms: u64,
}

/// Result of one run: the final state plus how it got there
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub state: ProcurementState,
    pub trace: Vec<NodeRecord>,
    /// Node the run stopped at, if it did not reach END
    pub halted_at: Option<String>,
}

impl ExecutionResult {
    pub fn succeeded(&self) -> bool {
        self.halted_at.is_none()
    }

    /// Names of visited nodes in order
    pub fn visited(&self) -> Vec<&str> {
        self.trace.iter().map(|r| r.node.as_str()).collect()
    }

    /// Surface a halted run as a collaborator failure
    pub fn into_result(self) -> Result<ProcurementState, ProcureError> {
        match self.halted_at {
            None => Ok(self.state),
            Some(node) => {
                let message = self
                    .state
                    .error(&node)
                    .unwrap_or("step failed")
                    .to_string();
                Err(ProcureError::collaborator(node, message))
            }
        }
    }
}

/// Executable graph produced by `StateGraph::compile`
pub struct CompiledGraph {
    nodes: HashMap<String, Arc<dyn Step>>,
    node_order: Vec<String>,
    edges: Vec<Edge>,
    entry: String,
    policy: FailurePolicy,
}

impl CompiledGraph {
    pub(crate) fn new(
        nodes: HashMap<String, Arc<dyn Step>>,
        node_order: Vec<String>,
        edges: Vec<Edge>,
        entry: String,
    ) -> Self {
        Self {
            nodes,
            node_order,
            edges,
            entry,
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn entry_point(&self) -> &str {
        &self.entry
    }

    /// Registered node names in insertion order
    pub fn node_names(&self) -> &[String] {
        &self.node_order
    }

    /// Deterministic next position: the first edge leaving `node`
    pub fn successor(&self, node: &str) -> Option<&str> {
        self.edges
            .iter()
            .find(|e| e.from == node)
            .map(|e| e.to.as_str())
    }

    /// Nodes in the order a run visits them
    pub fn chain(&self) -> Vec<&str> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(self.entry.as_str());

        while let Some(node) = current {
            if node == END || !seen.insert(node) {
                break;
            }
            chain.push(node);
            current = self.successor(node);
        }
        chain
    }

    /// One-line rendering of the walked chain, e.g. `START -> A -> END`
    pub fn describe(&self) -> String {
        let mut parts = vec!["START"];
        parts.extend(self.chain());
        parts.push(display_name(END));
        parts.join(" -> ")
    }

    /// Step names seeded in `state` that are not nodes of this graph
    pub fn unknown_steps<'a>(&self, state: &'a ProcurementState) -> Vec<&'a str> {
        state
            .steps()
            .keys()
            .map(String::as_str)
            .filter(|step| !self.nodes.contains_key(*step))
            .collect()
    }

    /// Reject a seeded state whose `steps` names nodes outside this graph
    pub fn validate_seed(&self, state: &ProcurementState) -> Result<(), ProcureError> {
        let unknown = self.unknown_steps(state);
        if unknown.is_empty() {
            return Ok(());
        }
        Err(ProcureError::config(format!(
            "seeded steps are not part of the workflow: {} (nodes: {})",
            unknown.join(", "),
            self.node_order.join(", ")
        )))
    }

    /// Walk the graph from the entry point to END.
    ///
    /// Each visited step's update is merged into the state before moving
    /// on. The state is returned in every case, including a halted run.
    pub async fn invoke(&self, initial_state: ProcurementState) -> ExecutionResult {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let mut state = initial_state;
        let mut trace = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut halted_at = None;
        let mut current = self.entry.clone();

        log::info!("Run {} starting at {}", run_id, current);

        let unknown: Vec<String> = self
            .unknown_steps(&state)
            .into_iter()
            .map(str::to_string)
            .collect();
        for step in &unknown {
            log::error!("Run {}: dropping seeded status for unknown step {}", run_id, step);
            state.forget_step(step);
        }

        while current != END {
            if !visited.insert(current.clone()) {
                log::error!("Run {} revisited node {}, stopping", run_id, current);
                state.record_failure(&current, "node visited twice in one run");
                halted_at = Some(current);
                break;
            }

            let Some(step) = self.nodes.get(&current) else {
                // compile() guarantees every edge target is registered
                log::error!("Run {} reached unregistered node {}", run_id, current);
                halted_at = Some(current);
                break;
            };

            let before = state.status(&current);
            let node_start = Instant::now();
            let update = step.run(&current, &state).await;
            let skipped = update.is_empty() && before.is_terminal();

            let merged = if update.step() != current {
                Err(StateError::ForeignStep {
                    node: current.clone(),
                    step: update.step().to_string(),
                })
            } else {
                state.merge(update)
            };
            if let Err(e) = merged {
                log::error!("Run {}: rejected update from {}: {}", run_id, current, e);
                state.record_failure(&current, e.to_string());
            }

            if state.status(&current) == StepStatus::Pending {
                log::error!("Step {} finished without setting a status", current);
                state.record_failure(&current, "step finished without setting a status");
            }

            let status = state.status(&current);
            trace.push(NodeRecord {
                node: current.clone(),
                status,
                skipped,
                elapsed_ms: node_start.elapsed().as_millis() as u64,
            });

            match status {
                StepStatus::Completed => log::info!("Node {} completed", current),
                _ if self.policy == FailurePolicy::Halt => {
                    log::warn!("Run {} halting at failed step {}", run_id, current);
                    halted_at = Some(current);
                    break;
                }
                _ => {
                    log::warn!("Run {}: step {} failed, continuing", run_id, current);
                }
            }

            current = match self.successor(&current) {
                Some(next) => next.to_string(),
                None => {
                    log::error!("Node {} has no outgoing edge", current);
                    halted_at = Some(current);
                    break;
                }
            };
        }

        let finished_at = Utc::now();
        log::info!(
            "Run {} finished in {} ms ({} nodes visited{})",
            run_id,
            (finished_at - started_at).num_milliseconds(),
            trace.len(),
            halted_at
                .as_deref()
                .map(|n| format!(", halted at {}", n))
                .unwrap_or_default()
        );

        ExecutionResult {
            run_id,
            started_at,
            finished_at,
            state,
            trace,
            halted_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::procure::workflow::graph::{StateGraph, START};
    use crate::procure::workflow::state::StateUpdate;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Step that appends its name to a shared log and can be told to fail
    struct TracingStep {
        log: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    #[async_trait]
    impl Step for TracingStep {
        async fn execute(
            &self,
            name: &str,
            state: &ProcurementState,
        ) -> Result<StateUpdate, ProcureError> {
            self.log.lock().unwrap().push(name.to_string());
            if self.fail {
                return Err(ProcureError::collaborator(name, "service returned failure"));
            }
            let seen = state.data().len();
            Ok(StateUpdate::completed(name).with_data(format!("{}.seen", name), seen))
        }
    }

    /// Step that reports success without saying so in its update
    struct SilentStep;

    #[async_trait]
    impl Step for SilentStep {
        async fn execute(
            &self,
            name: &str,
            _state: &ProcurementState,
        ) -> Result<StateUpdate, ProcureError> {
            Ok(StateUpdate::unchanged(name).with_data("silent", true))
        }
    }

    /// Step that writes an update for someone else
    struct ImpostorStep;

    #[async_trait]
    impl Step for ImpostorStep {
        async fn execute(
            &self,
            _name: &str,
            _state: &ProcurementState,
        ) -> Result<StateUpdate, ProcureError> {
            Ok(StateUpdate::completed("SomeoneElse"))
        }
    }

    fn chain(names: &[&str], failing: &[&str]) -> (CompiledGraph, Arc<Mutex<Vec<String>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut graph = StateGraph::new();
        for name in names {
            graph
                .add_node(
                    *name,
                    Arc::new(TracingStep {
                        log: log.clone(),
                        fail: failing.contains(name),
                    }),
                )
                .unwrap();
        }
        graph.add_edge(START, names[0]).unwrap();
        for pair in names.windows(2) {
            graph.add_edge(pair[0], pair[1]).unwrap();
        }
        graph.add_edge(names[names.len() - 1], END).unwrap();
        (graph.compile().unwrap(), log)
    }

    #[tokio::test]
    async fn test_visits_every_node_once_in_order() {
        let (graph, log) = chain(&["a", "b", "c"], &[]);

        let result = graph.invoke(ProcurementState::default()).await;

        assert!(result.succeeded());
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
        assert_eq!(result.visited(), vec!["a", "b", "c"]);
        assert!(result.state.is_completed("c"));
    }

    #[tokio::test]
    async fn test_each_step_sees_previous_output() {
        let (graph, _) = chain(&["a", "b", "c"], &[]);

        let state = graph.invoke(ProcurementState::default()).await.state;

        assert_eq!(state.get("a.seen"), Some(&json!(0)));
        assert_eq!(state.get("b.seen"), Some(&json!(1)));
        assert_eq!(state.get("c.seen"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn test_halt_policy_stops_at_failure() {
        let (graph, log) = chain(&["a", "b", "c"], &["b"]);

        let result = graph.invoke(ProcurementState::default()).await;

        assert_eq!(result.halted_at.as_deref(), Some("b"));
        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
        assert_eq!(result.state.status("b"), StepStatus::Failed);
        assert_eq!(result.state.status("c"), StepStatus::Pending);

        let err = result.into_result().unwrap_err();
        assert!(err.to_string().contains("service returned failure"));
    }

    #[tokio::test]
    async fn test_continue_policy_walks_past_failure() {
        let (graph, log) = chain(&["a", "b", "c"], &["b"]);
        let graph = graph.with_failure_policy(FailurePolicy::Continue);

        let result = graph.invoke(ProcurementState::default()).await;

        assert!(result.succeeded());
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
        assert_eq!(result.state.status("b"), StepStatus::Failed);
        assert!(result.state.is_completed("c"));
    }

    #[tokio::test]
    async fn test_preseeded_completed_step_is_skipped() {
        let (graph, log) = chain(&["a", "b"], &[]);
        let mut state = ProcurementState::default();
        state.mark_completed("a");

        let result = graph.invoke(state).await;

        assert_eq!(*log.lock().unwrap(), vec!["b"]);
        assert!(result.trace[0].skipped);
        assert!(!result.trace[1].skipped);
        assert!(result.state.is_completed("a"));
    }

    #[tokio::test]
    async fn test_preseeded_failed_step_halts() {
        let (graph, log) = chain(&["a", "b"], &[]);
        let mut state = ProcurementState::default();
        state.merge(StateUpdate::failed("a", "earlier run")).unwrap();

        let result = graph.invoke(state).await;

        assert!(log.lock().unwrap().is_empty());
        assert_eq!(result.halted_at.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_foreign_update_is_rejected() {
        let mut graph = StateGraph::new();
        graph.add_node("a", Arc::new(ImpostorStep)).unwrap();
        graph.add_edge(START, "a").unwrap();
        graph.add_edge("a", END).unwrap();

        let result = graph.compile().unwrap().invoke(ProcurementState::default()).await;

        assert_eq!(result.halted_at.as_deref(), Some("a"));
        assert!(result.state.steps().get("SomeoneElse").is_none());
        assert!(result.state.error("a").unwrap().contains("SomeoneElse"));
    }

    #[tokio::test]
    async fn test_step_without_status_fails_and_halts() {
        let mut graph = StateGraph::new();
        graph.add_node("a", Arc::new(SilentStep)).unwrap();
        graph.add_node("b", Arc::new(SilentStep)).unwrap();
        graph.add_edge(START, "a").unwrap();
        graph.add_edge("a", "b").unwrap();
        graph.add_edge("b", END).unwrap();

        let result = graph.compile().unwrap().invoke(ProcurementState::default()).await;

        assert_eq!(result.halted_at.as_deref(), Some("a"));
        assert_eq!(result.state.status("a"), StepStatus::Failed);
        assert_eq!(result.trace[0].status, StepStatus::Failed);
        assert!(result.state.error("a").unwrap().contains("without setting a status"));
        assert_eq!(result.visited(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_unknown_seeded_steps_are_dropped() {
        let (graph, log) = chain(&["ProposalProcessor"], &[]);
        let mut state = ProcurementState::default();
        state.mark_completed("NegotiationEmail");

        assert!(matches!(
            graph.validate_seed(&state),
            Err(ProcureError::Config(ref msg)) if msg.contains("NegotiationEmail")
        ));

        let result = graph.invoke(state).await;

        assert!(result.succeeded());
        assert_eq!(*log.lock().unwrap(), vec!["ProposalProcessor"]);
        let keys: Vec<_> = result.state.steps().keys().cloned().collect();
        assert_eq!(keys, vec!["ProposalProcessor"]);
    }

    #[test]
    fn test_validate_seed_accepts_known_steps() {
        let (graph, _) = chain(&["a", "b"], &[]);
        let mut state = ProcurementState::default();
        state.mark_completed("a");

        assert!(graph.validate_seed(&state).is_ok());
        assert!(graph.unknown_steps(&state).is_empty());
    }

    #[tokio::test]
    async fn test_fan_out_cycle_is_cut() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut graph = StateGraph::new();
        graph.allow_fan_out(true);
        for name in ["a", "b"] {
            graph
                .add_node(
                    name,
                    Arc::new(TracingStep {
                        log: log.clone(),
                        fail: false,
                    }),
                )
                .unwrap();
        }
        graph.add_edge(START, "a").unwrap();
        graph.add_edge("a", "b").unwrap();
        graph.add_edge("b", "a").unwrap();
        graph.add_edge("b", END).unwrap();
        let compiled = graph.compile().unwrap();

        let result = compiled.invoke(ProcurementState::default()).await;

        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
        assert_eq!(result.halted_at.as_deref(), Some("a"));
    }

    #[test]
    fn test_describe() {
        let (graph, _) = chain(&["ProposalProcessor", "RFPAnalysis"], &[]);
        assert_eq!(
            graph.describe(),
            "START -> ProposalProcessor -> RFPAnalysis -> END"
        );
        assert_eq!(graph.failure_policy(), FailurePolicy::Halt);
    }

    #[test]
    fn test_failure_policy_from_str() {
        assert_eq!("halt".parse::<FailurePolicy>().unwrap(), FailurePolicy::Halt);
        assert_eq!(" Continue ".parse::<FailurePolicy>().unwrap(), FailurePolicy::Continue);
        assert!(matches!(
            "retry".parse::<FailurePolicy>(),
            Err(ProcureError::Config(_))
        ));
    }
}
