// SPDX-License-Identifier: MIT

//! Collaborators the workflow steps call
//!
//! Every external dependency a step has is reached through one of these
//! handles, so tests can swap any of them for a mock.

pub mod artifacts;
pub mod index;
pub mod ingest;
pub mod structured;

pub use artifacts::{ArtifactStore, MarkdownStore};
pub use index::{LocalProposalIndex, ProposalChunk, ProposalIndex, SupplierMetadata};
pub use ingest::{
    DirectoryIngestor, DocumentIngestor, IngestReport, IngestStatus, TextExtractor, TextSplitter,
    Utf8Extractor,
};

use std::sync::Arc;

use crate::adk::agent::{Agent, LLMAgent};
use crate::adk::error::ProcureError;
use crate::adk::model::openai::OpenAIModel;
use crate::adk::model::Model;
use crate::procure::config::Settings;

/// One agent per generation role
#[derive(Clone)]
pub struct Agents {
    pub supplier_extractor: Arc<dyn Agent>,
    pub comparison_writer: Arc<dyn Agent>,
    pub risk_analyst: Arc<dyn Agent>,
    pub forecaster: Arc<dyn Agent>,
    pub strategist: Arc<dyn Agent>,
    pub email_writer: Arc<dyn Agent>,
    pub counter_offer_writer: Arc<dyn Agent>,
    pub contract_drafter: Arc<dyn Agent>,
    pub legal_reviewer: Arc<dyn Agent>,
    pub contract_reviser: Arc<dyn Agent>,
}

impl Agents {
    /// Build every role over the same model
    pub fn from_model(model: Arc<dyn Model>) -> Self {
        let agent = |name: &str, instruction: &str, temperature: f32| -> Arc<dyn Agent> {
            Arc::new(LLMAgent::new(name, instruction, model.clone(), temperature))
        };

        Self {
            supplier_extractor: agent(
                "supplier_extractor",
                "You extract structured facts from supplier proposals for a procurement team. \
                 Only report what the proposal states.",
                0.7,
            ),
            comparison_writer: agent(
                "comparison_writer",
                "You are a procurement analyst writing comparative supplier evaluation reports \
                 in professional markdown with tables and clear sections.",
                0.7,
            ),
            risk_analyst: agent(
                "risk_analyst",
                "You are a financial risk analyst specialising in pricing strategy and \
                 supplier price volatility.",
                0.7,
            ),
            forecaster: agent(
                "forecaster",
                "You are an economic forecaster. Demand above supply raises prices, supply \
                 above demand lowers them.",
                0.7,
            ),
            strategist: agent(
                "strategist",
                "You are a procurement strategy expert preparing negotiation charters.",
                0.7,
            ),
            email_writer: agent(
                "email_writer",
                "You are a consulting director writing formal, persuasive supplier \
                 negotiation emails.",
                0.7,
            ),
            counter_offer_writer: agent(
                "counter_offer_writer",
                "You are a consulting director preparing counteroffers to anticipated \
                 supplier responses.",
                0.7,
            ),
            contract_drafter: agent(
                "contract_drafter",
                "You are a legal assistant drafting Master Service Agreements from \
                 negotiation records.",
                0.5,
            ),
            legal_reviewer: agent(
                "legal_reviewer",
                "You are a legal contract reviewer for procurement agreements. You compare \
                 contracts against negotiation documents and report deviations.",
                0.5,
            ),
            contract_reviser: agent(
                "contract_reviser",
                "You are a contract lawyer. Apply review feedback with minimal, precise \
                 edits and keep the markdown structure unchanged.",
                0.2,
            ),
        }
    }
}

/// Handles injected into every step
#[derive(Clone)]
pub struct Services {
    pub ingestor: Arc<dyn DocumentIngestor>,
    pub index: Arc<dyn ProposalIndex>,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub agents: Agents,
}

impl Services {
    /// Wire the production collaborators described by `settings`
    pub async fn from_settings(settings: &Settings) -> Result<Self, ProcureError> {
        let model: Arc<dyn Model> = Arc::new(OpenAIModel::new(
            settings.model.clone(),
            settings.base_url.clone(),
        )?);
        log::info!("Using OpenAI model: {}", settings.model);

        let index: Arc<dyn ProposalIndex> =
            Arc::new(LocalProposalIndex::open(&settings.index_path).await?);
        let splitter = TextSplitter::new(settings.chunk_size, settings.chunk_overlap);

        Ok(Self {
            ingestor: Arc::new(DirectoryIngestor::new(index.clone(), splitter)),
            index,
            artifacts: Arc::new(MarkdownStore::new(&settings.output_dir)),
            agents: Agents::from_model(model),
        })
    }
}
