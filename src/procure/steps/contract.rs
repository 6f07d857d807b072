// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;

use super::{artifacts, context_block, keys, Upstream};
use crate::adk::agent::Agent;
use crate::adk::error::ProcureError;
use crate::procure::services::structured::{format_instructions, parse_as};
use crate::procure::services::ArtifactStore;
use crate::procure::workflow::state::{ProcurementState, StateUpdate};
use crate::procure::workflow::step::Step;

const CONTRACT_SECTIONS: &str = "\
# Master Service Agreement (MSA)
1. Scope of Agreement
2. Pricing & Payment Terms (base pricing, volume discounts, price protection, payment terms)
3. Service Level Agreements (uptime, response and resolution times, penalties)
4. Contract Term & Exit Clause
5. Compliance & Data Protection
6. Negotiated Benefits
7. Dispute Resolution & Governing Law
8. Acceptance & Signatures";

#[derive(Debug, Deserialize, JsonSchema)]
struct ContractDraft {
    /// The final structured contract in markdown format
    contract: String,
}

/// Drafts the Master Service Agreement from the negotiation record
pub struct ContractGeneratorStep {
    drafter: Arc<dyn Agent>,
    artifacts: Arc<dyn ArtifactStore>,
}

impl ContractGeneratorStep {
    pub fn new(drafter: Arc<dyn Agent>, artifacts: Arc<dyn ArtifactStore>) -> Self {
        Self { drafter, artifacts }
    }
}

#[async_trait]
impl Step for ContractGeneratorStep {
    async fn execute(
        &self,
        name: &str,
        state: &ProcurementState,
    ) -> Result<StateUpdate, ProcureError> {
        let store = self.artifacts.as_ref();
        let mut documents = Vec::new();

        for upstream in [Upstream::RFP_ANALYSIS, Upstream::PRICING_RISK, Upstream::CHARTER] {
            documents.push((upstream.file, upstream.require(state, store).await?));
        }
        for upstream in [
            Upstream::NEGOTIATION_EMAIL,
            Upstream::COUNTER_OFFER_EMAIL,
            Upstream::COUNTER_OFFER_STRATEGY,
        ] {
            if let Some(text) = upstream.optional(state, store).await? {
                documents.push((upstream.file, text));
            }
        }

        let prompt = format!(
            "Based on the negotiation data below, draft a comprehensive Master Service \
             Agreement between the client and the supplier, following this outline:\n\n\
             {}\n\nNegotiation data:\n{}\n{}",
            CONTRACT_SECTIONS,
            context_block(&documents),
            format_instructions::<ContractDraft>()
        );

        let reply = self.drafter.run(prompt).await?;
        let contract = parse_as::<ContractDraft>(&reply)?.contract;
        let path = self
            .artifacts
            .save(&contract, artifacts::FINAL_CONTRACT)
            .await?;

        Ok(StateUpdate::completed(name)
            .with_output_file(path.to_string_lossy())
            .with_data(keys::DRAFT_CONTRACT, contract))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::procure::steps::test_support::{store, ScriptedAgent};
    use crate::procure::workflow::state::StepStatus;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_reads_upstream_from_artifacts_on_resume() {
        let dir = tempdir().unwrap();
        let artifacts = store(dir.path());
        artifacts.save("rfp", "1.rfp_comparative_analysis.md").await.unwrap();
        artifacts.save("risk", "2.pricing_risk_analysis.md").await.unwrap();
        artifacts.save("charter", "3.negotiation_charter.md").await.unwrap();
        artifacts.save("counter", "5a.counteroffer_strategy.md").await.unwrap();

        let drafter = ScriptedAgent::replying(&[r###"{"contract": "# Master Service Agreement"}"###]);
        let step = ContractGeneratorStep::new(drafter.clone(), artifacts);
        let mut state = ProcurementState::default();

        let update = step.run("ContractGenerator", &state).await;
        state.merge(update).unwrap();

        assert!(state.is_completed("ContractGenerator"));
        assert_eq!(
            state.get_str(keys::DRAFT_CONTRACT),
            Some("# Master Service Agreement")
        );
        let input = drafter.last_input();
        assert!(input.contains("### 2.pricing_risk_analysis.md\nrisk"));
        assert!(input.contains("### 5a.counteroffer_strategy.md\ncounter"));
        assert!(!input.contains("4.negotiation_email.md"));
    }

    #[tokio::test]
    async fn test_missing_charter_fails_with_data_format() {
        let dir = tempdir().unwrap();
        let artifacts = store(dir.path());
        artifacts.save("rfp", "1.rfp_comparative_analysis.md").await.unwrap();
        artifacts.save("risk", "2.pricing_risk_analysis.md").await.unwrap();

        let drafter = ScriptedAgent::replying(&["unused"]);
        let step = ContractGeneratorStep::new(drafter.clone(), artifacts);
        let mut state = ProcurementState::default();

        let update = step.run("ContractGenerator", &state).await;
        state.merge(update).unwrap();

        assert_eq!(state.status("ContractGenerator"), StepStatus::Failed);
        let error = state.error("ContractGenerator").unwrap();
        assert!(error.contains("Data format error"));
        assert!(error.contains("3.negotiation_charter.md"));
        assert_eq!(drafter.calls(), 0);
    }
}
