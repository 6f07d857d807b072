// SPDX-License-Identifier: MIT

//! The procurement steps
//!
//! Each step is a `Step` implementation holding the collaborator handles it
//! needs. `StepKind` names them and builds them from a `Services` bundle.

mod charter;
mod contract;
mod correspondence;
mod legal_review;
mod pricing_risk;
mod proposal;
mod revision;
mod rfp_analysis;

pub use charter::NegotiationCharterStep;
pub use contract::ContractGeneratorStep;
pub use correspondence::{CounterOfferStep, NegotiationEmailStep};
pub use legal_review::{render_review, ContractReview, LegalReviewStep};
pub use pricing_risk::PricingRiskStep;
pub use proposal::ProposalProcessorStep;
pub use revision::ContractRevisionStep;
pub use rfp_analysis::RfpAnalysisStep;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::adk::error::ProcureError;
use crate::procure::services::structured::value_to_text;
use crate::procure::services::{ArtifactStore, Services};
use crate::procure::workflow::state::ProcurementState;
use crate::procure::workflow::step::Step;

/// Input file keys seeded before a run
pub mod inputs {
    pub const PROPOSAL_PDFS: &str = "proposal_pdfs";
    pub const PRICING_HISTORY: &str = "pricing_history";
    pub const SUPPLY_DEMAND: &str = "supply_demand";
}

/// Markdown artifacts written under the output directory
pub mod artifacts {
    pub const RFP_ANALYSIS: &str = "1.rfp_comparative_analysis.md";
    pub const PRICING_RISK: &str = "2.pricing_risk_analysis.md";
    pub const NEGOTIATION_CHARTER: &str = "3.negotiation_charter.md";
    pub const NEGOTIATION_EMAIL: &str = "4.negotiation_email.md";
    pub const COUNTER_OFFER_EMAIL: &str = "5.counter_offer_email.md";
    pub const COUNTER_OFFER_STRATEGY: &str = "5a.counteroffer_strategy.md";
    pub const FINAL_CONTRACT: &str = "6.final_contract.md";
    pub const CONTRACT_REVIEW: &str = "7.contract_review.md";
    pub const REVISED_CONTRACT: &str = "8.revised_contract.md";
}

/// Keys in the state's data payload
pub mod keys {
    pub const PROCESSED_FILES: &str = "processed_files";
    pub const PROPOSAL_FILES: &str = "proposal_files";
    pub const SUPPLIERS: &str = "suppliers";
    pub const RFP_ANALYSIS: &str = "rfp_analysis";
    pub const PRICING_RISK_REPORT: &str = "pricing_risk_report";
    pub const PRICE_FORECAST: &str = "price_forecast";
    pub const NEGOTIATION_CHARTER: &str = "negotiation_charter";
    pub const NEGOTIATION_EMAIL: &str = "negotiation_email";
    pub const COUNTER_OFFER_EMAIL: &str = "counter_offer_email";
    pub const COUNTER_OFFER_STRATEGY: &str = "counteroffer_strategy";
    pub const DRAFT_CONTRACT: &str = "draft_contract";
    pub const REVIEW_FEEDBACK: &str = "review_feedback";
    pub const FINAL_VERDICT: &str = "final_verdict";
    pub const FINAL_CONTRACT: &str = "final_contract";
}

/// Every step the workflow knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepKind {
    ProposalProcessor,
    #[serde(rename = "RFPAnalysis")]
    RfpAnalysis,
    PricingRiskAnalysis,
    NegotiationCharter,
    NegotiationEmail,
    CounterOffer,
    ContractGenerator,
    LegalReview,
    ContractRevision,
}

impl StepKind {
    pub const ALL: [StepKind; 9] = [
        StepKind::ProposalProcessor,
        StepKind::RfpAnalysis,
        StepKind::PricingRiskAnalysis,
        StepKind::NegotiationCharter,
        StepKind::NegotiationEmail,
        StepKind::CounterOffer,
        StepKind::ContractGenerator,
        StepKind::LegalReview,
        StepKind::ContractRevision,
    ];

    /// Node name used in the graph and the state's `steps` map
    pub fn name(self) -> &'static str {
        match self {
            StepKind::ProposalProcessor => "ProposalProcessor",
            StepKind::RfpAnalysis => "RFPAnalysis",
            StepKind::PricingRiskAnalysis => "PricingRiskAnalysis",
            StepKind::NegotiationCharter => "NegotiationCharter",
            StepKind::NegotiationEmail => "NegotiationEmail",
            StepKind::CounterOffer => "CounterOffer",
            StepKind::ContractGenerator => "ContractGenerator",
            StepKind::LegalReview => "LegalReview",
            StepKind::ContractRevision => "ContractRevision",
        }
    }

    /// The primary artifact this step writes, if any
    pub fn artifact(self) -> Option<&'static str> {
        match self {
            StepKind::ProposalProcessor => None,
            StepKind::RfpAnalysis => Some(artifacts::RFP_ANALYSIS),
            StepKind::PricingRiskAnalysis => Some(artifacts::PRICING_RISK),
            StepKind::NegotiationCharter => Some(artifacts::NEGOTIATION_CHARTER),
            StepKind::NegotiationEmail => Some(artifacts::NEGOTIATION_EMAIL),
            StepKind::CounterOffer => Some(artifacts::COUNTER_OFFER_EMAIL),
            StepKind::ContractGenerator => Some(artifacts::FINAL_CONTRACT),
            StepKind::LegalReview => Some(artifacts::CONTRACT_REVIEW),
            StepKind::ContractRevision => Some(artifacts::REVISED_CONTRACT),
        }
    }

    /// Correspondence steps only run when explicitly enabled
    pub fn is_optional(self) -> bool {
        matches!(self, StepKind::NegotiationEmail | StepKind::CounterOffer)
    }

    /// Steps in execution order
    pub fn chain(include_correspondence: bool) -> Vec<StepKind> {
        Self::ALL
            .into_iter()
            .filter(|kind| include_correspondence || !kind.is_optional())
            .collect()
    }

    /// Build the step with its collaborators
    pub fn build(self, services: &Services) -> Arc<dyn Step> {
        let artifacts = services.artifacts.clone();
        let agents = &services.agents;
        match self {
            StepKind::ProposalProcessor => {
                Arc::new(ProposalProcessorStep::new(services.ingestor.clone()))
            }
            StepKind::RfpAnalysis => Arc::new(RfpAnalysisStep::new(
                services.index.clone(),
                agents.supplier_extractor.clone(),
                agents.comparison_writer.clone(),
                artifacts,
            )),
            StepKind::PricingRiskAnalysis => Arc::new(PricingRiskStep::new(
                agents.risk_analyst.clone(),
                artifacts,
            )),
            StepKind::NegotiationCharter => Arc::new(NegotiationCharterStep::new(
                agents.forecaster.clone(),
                agents.strategist.clone(),
                artifacts,
            )),
            StepKind::NegotiationEmail => Arc::new(NegotiationEmailStep::new(
                agents.email_writer.clone(),
                artifacts,
            )),
            StepKind::CounterOffer => Arc::new(CounterOfferStep::new(
                agents.counter_offer_writer.clone(),
                agents.email_writer.clone(),
                artifacts,
            )),
            StepKind::ContractGenerator => Arc::new(ContractGeneratorStep::new(
                agents.contract_drafter.clone(),
                artifacts,
            )),
            StepKind::LegalReview => Arc::new(LegalReviewStep::new(
                agents.legal_reviewer.clone(),
                artifacts,
            )),
            StepKind::ContractRevision => Arc::new(ContractRevisionStep::new(
                agents.contract_reviser.clone(),
                artifacts,
            )),
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StepKind {
    type Err = ProcureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ProcureError::config(format!("unknown step '{}'", s)))
    }
}

/// An upstream document a step reads: the state key it is handed forward
/// under and the artifact file it was saved to
#[derive(Debug, Clone, Copy)]
pub(crate) struct Upstream {
    pub key: &'static str,
    pub file: &'static str,
}

impl Upstream {
    pub const RFP_ANALYSIS: Upstream = Upstream::new(keys::RFP_ANALYSIS, artifacts::RFP_ANALYSIS);
    pub const PRICING_RISK: Upstream =
        Upstream::new(keys::PRICING_RISK_REPORT, artifacts::PRICING_RISK);
    pub const CHARTER: Upstream =
        Upstream::new(keys::NEGOTIATION_CHARTER, artifacts::NEGOTIATION_CHARTER);
    pub const NEGOTIATION_EMAIL: Upstream =
        Upstream::new(keys::NEGOTIATION_EMAIL, artifacts::NEGOTIATION_EMAIL);
    pub const COUNTER_OFFER_EMAIL: Upstream =
        Upstream::new(keys::COUNTER_OFFER_EMAIL, artifacts::COUNTER_OFFER_EMAIL);
    pub const COUNTER_OFFER_STRATEGY: Upstream =
        Upstream::new(keys::COUNTER_OFFER_STRATEGY, artifacts::COUNTER_OFFER_STRATEGY);
    pub const CONTRACT: Upstream = Upstream::new(keys::DRAFT_CONTRACT, artifacts::FINAL_CONTRACT);
    pub const REVIEW: Upstream = Upstream::new(keys::REVIEW_FEEDBACK, artifacts::CONTRACT_REVIEW);

    const fn new(key: &'static str, file: &'static str) -> Self {
        Self { key, file }
    }

    /// Read from the state first, then from the artifact store
    pub async fn read(
        self,
        state: &ProcurementState,
        store: &dyn ArtifactStore,
    ) -> Result<Option<String>, ProcureError> {
        if let Some(value) = state.get(self.key) {
            let text = value_to_text(value);
            if !text.trim().is_empty() {
                return Ok(Some(text));
            }
        }
        Ok(store
            .load(self.file)
            .await?
            .filter(|text| !text.trim().is_empty()))
    }

    /// Read a document the step cannot run without
    pub async fn require(
        self,
        state: &ProcurementState,
        store: &dyn ArtifactStore,
    ) -> Result<String, ProcureError> {
        self.read(state, store).await?.ok_or_else(|| {
            ProcureError::data_format(format!(
                "required upstream artifact {} is missing",
                self.file
            ))
        })
    }

    /// Read a document the step can do without, warning when it is absent
    pub async fn optional(
        self,
        state: &ProcurementState,
        store: &dyn ArtifactStore,
    ) -> Result<Option<String>, ProcureError> {
        let text = self.read(state, store).await?;
        if text.is_none() {
            log::warn!("{} not found, continuing without it", self.file);
        }
        Ok(text)
    }
}

/// Join documents under `### <file>` headings
pub(crate) fn context_block(documents: &[(&str, String)]) -> String {
    documents
        .iter()
        .map(|(file, text)| format!("### {}\n{}\n", file, text))
        .collect::<Vec<_>>()
        .join("\n")
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::procure::services::MarkdownStore;
    use crate::procure::workflow::state::StateUpdate;
    use tempfile::tempdir;

    #[test]
    fn test_chain_order() {
        let names: Vec<&str> = StepKind::chain(false).into_iter().map(StepKind::name).collect();
        assert_eq!(
            names,
            vec![
                "ProposalProcessor",
                "RFPAnalysis",
                "PricingRiskAnalysis",
                "NegotiationCharter",
                "ContractGenerator",
                "LegalReview",
                "ContractRevision",
            ]
        );

        let with_mail = StepKind::chain(true);
        assert_eq!(with_mail.len(), 9);
        assert_eq!(with_mail[4], StepKind::NegotiationEmail);
        assert_eq!(with_mail[5], StepKind::CounterOffer);
    }

    #[test]
    fn test_step_kind_from_str() {
        assert_eq!("rfpanalysis".parse::<StepKind>().unwrap(), StepKind::RfpAnalysis);
        assert_eq!(
            "LegalReview".parse::<StepKind>().unwrap().to_string(),
            "LegalReview"
        );
        assert!("Unknown".parse::<StepKind>().is_err());
    }

    #[test]
    fn test_artifact_names() {
        assert_eq!(StepKind::ProposalProcessor.artifact(), None);
        assert_eq!(
            StepKind::ContractRevision.artifact(),
            Some("8.revised_contract.md")
        );
    }

    #[tokio::test]
    async fn test_upstream_prefers_state_then_store() {
        let dir = tempdir().unwrap();
        let store = MarkdownStore::new(dir.path());
        store.save("from disk", artifacts::RFP_ANALYSIS).await.unwrap();

        let empty = ProcurementState::default();
        assert_eq!(
            Upstream::RFP_ANALYSIS.read(&empty, &store).await.unwrap().as_deref(),
            Some("from disk")
        );

        let mut state = ProcurementState::default();
        state
            .merge(StateUpdate::completed("RFPAnalysis").with_data(keys::RFP_ANALYSIS, "from state"))
            .unwrap();
        assert_eq!(
            Upstream::RFP_ANALYSIS.read(&state, &store).await.unwrap().as_deref(),
            Some("from state")
        );
    }

    #[tokio::test]
    async fn test_missing_required_upstream_is_data_format_error() {
        let dir = tempdir().unwrap();
        let store = MarkdownStore::new(dir.path());

        let err = Upstream::CONTRACT
            .require(&ProcurementState::default(), &store)
            .await
            .unwrap_err();

        assert!(matches!(err, ProcureError::DataFormat(_)));
        assert!(err.to_string().contains("6.final_contract.md"));
    }

    #[test]
    fn test_context_block() {
        let block = context_block(&[("a.md", "A".to_string()), ("b.md", "B".to_string())]);
        assert_eq!(block, "### a.md\nA\n\n### b.md\nB\n");
    }
}
