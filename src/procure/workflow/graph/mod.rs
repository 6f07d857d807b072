// SPDX-License-Identifier: MIT

//! Graph-based workflow execution
//!
//! `StateGraph` collects nodes and edges and validates them in `compile`.
//! The resulting `CompiledGraph` walks the chain from the entry point to
//! `END`, merging each step's update into the shared state.

pub mod builder;
pub mod executor;
pub mod types;

pub use builder::StateGraph;
pub use executor::{CompiledGraph, ExecutionResult, FailurePolicy, NodeRecord};
pub use types::{display_name, Edge, END, START};
