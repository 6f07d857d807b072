// SPDX-License-Identifier: MIT

//! Typed error handling for procure-rs
//!
//! `ProcureError` is the error every collaborator and step reports.
//! Graph construction and state invariants have their own enums so callers
//! can match on them without string inspection.

use std::fmt;
use thiserror::Error;

/// Top-level error type for procure-rs
#[derive(Debug, Error)]
pub enum ProcureError {
    /// Missing or malformed configuration (input directories, settings, env)
    #[error("Configuration error: {0}")]
    Config(String),

    /// An external service returned a non-success status or an empty result
    #[error("Collaborator '{service}' failed: {message}")]
    Collaborator { service: String, message: String },

    /// Input data or an upstream artifact is missing or malformed
    #[error("Data format error: {0}")]
    DataFormat(String),

    /// Workflow graph construction errors
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Shared state invariant violations
    #[error(transparent)]
    State(#[from] StateError),

    /// Model/LLM provider errors
    #[error(transparent)]
    Model(#[from] ModelError),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors raised while building or compiling a workflow graph
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GraphError {
    /// A node with the same name is already registered
    #[error("Node '{0}' is already registered")]
    DuplicateNode(String),

    /// An edge or entry point references a node that was never added
    #[error("Unknown node '{0}'")]
    UnknownNode(String),

    /// The entry point was already set to a different node
    #[error("Entry point already set to '{existing}', refusing '{requested}'")]
    MultipleEntryPoints { existing: String, requested: String },

    /// Node names may not shadow the START/END sentinels
    #[error("'{0}' is a reserved node name")]
    ReservedName(String),

    /// Structurally invalid edge (into START, out of END, START -> END)
    #[error("Invalid edge {from} -> {to}: {reason}")]
    InvalidEdge {
        from: String,
        to: String,
        reason: String,
    },

    /// Compile-time validation found one or more problems
    #[error("Graph validation failed: {0}")]
    Validation(ValidationReport),
}

/// A single problem found by graph validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    /// No nodes were registered
    EmptyGraph,
    /// Neither `set_entry_point` nor an edge from START was given
    MissingEntryPoint,
    /// Node cannot be reached from the entry point
    Unreachable(String),
    /// Node has no outgoing edge
    DeadEnd(String),
    /// Node has more than one outgoing edge in a linear graph
    MultipleSuccessors { node: String, targets: Vec<String> },
    /// Node is reachable but no path leads from it to END
    NeverReachesEnd(String),
}

impl ValidationIssue {
    /// The node this issue is about, if any
    pub fn node(&self) -> Option<&str> {
        match self {
            ValidationIssue::EmptyGraph | ValidationIssue::MissingEntryPoint => None,
            ValidationIssue::Unreachable(n)
            | ValidationIssue::DeadEnd(n)
            | ValidationIssue::NeverReachesEnd(n) => Some(n),
            ValidationIssue::MultipleSuccessors { node, .. } => Some(node),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyGraph => write!(f, "graph has no nodes"),
            ValidationIssue::MissingEntryPoint => write!(f, "no entry point set"),
            ValidationIssue::Unreachable(n) => write!(f, "node '{}' is unreachable", n),
            ValidationIssue::DeadEnd(n) => write!(f, "node '{}' has no outgoing edge", n),
            ValidationIssue::MultipleSuccessors { node, targets } => write!(
                f,
                "node '{}' has {} outgoing edges ({})",
                node,
                targets.len(),
                targets.join(", ")
            ),
            ValidationIssue::NeverReachesEnd(n) => write!(f, "node '{}' never reaches END", n),
        }
    }
}

/// Every issue found in one `compile()` call
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Distinct offending node names, in report order
    pub fn offending_nodes(&self) -> Vec<&str> {
        let mut nodes: Vec<&str> = Vec::new();
        for node in self.issues.iter().filter_map(|i| i.node()) {
            if !nodes.contains(&node) {
                nodes.push(node);
            }
        }
        nodes
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.issues.iter().map(|i| i.to_string()).collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Shared state invariant violations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StateError {
    /// A terminal status may not be replaced by a natural run
    #[error("Illegal status transition for step '{step}': {from} -> {to}")]
    IllegalTransition {
        step: String,
        from: String,
        to: String,
    },

    /// A node returned an update scoped to a different step
    #[error("Node '{node}' returned an update for step '{step}'")]
    ForeignStep { node: String, step: String },
}

/// Model/LLM-specific errors
#[derive(Debug, Error)]
pub enum ModelError {
    /// API key not configured
    #[error("API key not configured for provider: {0}")]
    ApiKeyMissing(String),

    /// Provider returned a non-success HTTP status
    #[error("{provider} API error ({status}): {body}")]
    Api {
        provider: String,
        status: u16,
        body: String,
    },

    /// Invalid response from model
    #[error("Invalid response from model: {0}")]
    InvalidResponse(String),
}

impl ProcureError {
    /// Create a collaborator failure
    pub fn collaborator(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Collaborator {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a data format error
    pub fn data_format(message: impl Into<String>) -> Self {
        Self::DataFormat(message.into())
    }
}
