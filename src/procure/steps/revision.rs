// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::sync::Arc;

use super::{artifacts, keys, Upstream};
use crate::adk::agent::Agent;
use crate::adk::error::ProcureError;
use crate::procure::services::ArtifactStore;
use crate::procure::workflow::state::{ProcurementState, StateUpdate};
use crate::procure::workflow::step::Step;

/// Applies the legal review to the contract with minimal edits
pub struct ContractRevisionStep {
    reviser: Arc<dyn Agent>,
    artifacts: Arc<dyn ArtifactStore>,
}

impl ContractRevisionStep {
    pub fn new(reviser: Arc<dyn Agent>, artifacts: Arc<dyn ArtifactStore>) -> Self {
        Self { reviser, artifacts }
    }
}

#[async_trait]
impl Step for ContractRevisionStep {
    async fn execute(
        &self,
        name: &str,
        state: &ProcurementState,
    ) -> Result<StateUpdate, ProcureError> {
        let store = self.artifacts.as_ref();
        let contract = Upstream::CONTRACT.require(state, store).await?;
        let review = Upstream::REVIEW.require(state, store).await?;

        let prompt = format!(
            "Incorporate all review feedback into the contract below.\n\
             - Only modify sections the review asks to correct.\n\
             - Do not restructure or rephrase beyond what is needed.\n\
             - Keep the markdown formatting unchanged.\n\
             Return the fully revised contract in markdown.\n\n\
             **Contract (before review):**\n{}\n\n**Review feedback:**\n{}",
            contract, review
        );

        let revised = self.reviser.run(prompt).await?;
        let path = self
            .artifacts
            .save(&revised, artifacts::REVISED_CONTRACT)
            .await?;

        Ok(StateUpdate::completed(name)
            .with_output_file(path.to_string_lossy())
            .with_data(keys::FINAL_CONTRACT, revised))
    }
}
