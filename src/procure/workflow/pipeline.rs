// SPDX-License-Identifier: MIT

//! Wiring of the procurement chain
//!
//! The primary workflow is a single linear chain from `ProposalProcessor`
//! to `ContractRevision`. The ingestion-only variant has one node.

use crate::adk::error::ProcureError;
use crate::procure::config::Settings;
use crate::procure::services::Services;
use crate::procure::steps::{inputs, StepKind};
use crate::procure::workflow::graph::{CompiledGraph, StateGraph, END, START};
use crate::procure::workflow::state::ProcurementState;

/// Shape of the chain to build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Run NegotiationEmail and CounterOffer before the contract
    pub include_correspondence: bool,
    /// Build only the ProposalProcessor node
    pub ingest_only: bool,
}

impl PipelineOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            include_correspondence: settings.include_correspondence,
            ingest_only: false,
        }
    }

    pub fn steps(&self) -> Vec<StepKind> {
        if self.ingest_only {
            vec![StepKind::ProposalProcessor]
        } else {
            StepKind::chain(self.include_correspondence)
        }
    }
}

/// Register `kinds` as a linear chain `START -> k0 -> .. -> kn -> END`
pub fn build_chain(services: &Services, kinds: &[StepKind]) -> Result<StateGraph, ProcureError> {
    let mut graph = StateGraph::new();
    for kind in kinds {
        graph.add_node(kind.name(), kind.build(services))?;
    }

    let mut previous = START;
    for kind in kinds {
        graph.add_edge(previous, kind.name())?;
        previous = kind.name();
    }
    graph.add_edge(previous, END)?;
    Ok(graph)
}

/// Build and compile the procurement workflow
pub fn build_workflow(
    services: &Services,
    options: PipelineOptions,
) -> Result<CompiledGraph, ProcureError> {
    let graph = build_chain(services, &options.steps())?;
    let compiled = graph.compile()?;
    log::info!("Compiled workflow: {}", compiled.describe());
    Ok(compiled)
}

/// The state a run starts from: input paths from settings, plus the skip
/// flag for ingestion when requested
pub fn initial_state(settings: &Settings) -> ProcurementState {
    let mut state = ProcurementState::default()
        .with_input(
            inputs::PROPOSAL_PDFS,
            settings.proposals_dir.to_string_lossy(),
        )
        .with_input(
            inputs::PRICING_HISTORY,
            settings.pricing_history.to_string_lossy(),
        )
        .with_input(
            inputs::SUPPLY_DEMAND,
            settings.supply_demand.to_string_lossy(),
        );

    if settings.skip_ingestion {
        log::warn!("Skipping ProposalProcessor (pre-marked as completed)");
        state.mark_completed(StepKind::ProposalProcessor.name());
    }
    state
}

/// Operator skip flags: pre-mark `kinds` as completed.
///
/// Every kind must be a node of `workflow`. Nothing is marked when one
/// is not.
pub fn mark_completed(
    workflow: &CompiledGraph,
    state: &mut ProcurementState,
    kinds: &[StepKind],
) -> Result<(), ProcureError> {
    let nodes = workflow.node_names();
    let missing: Vec<&str> = kinds
        .iter()
        .map(|kind| kind.name())
        .filter(|name| !nodes.iter().any(|node| node == name))
        .collect();
    if !missing.is_empty() {
        return Err(ProcureError::config(format!(
            "cannot mark {} as completed: not in this workflow ({})",
            missing.join(", "),
            nodes.join(", ")
        )));
    }

    for kind in kinds {
        log::warn!("Skipping {} (pre-marked as completed)", kind);
        state.mark_completed(kind.name());
    }
    Ok(())
}
