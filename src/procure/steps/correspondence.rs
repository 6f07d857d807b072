// SPDX-License-Identifier: MIT

//! Supplier negotiation correspondence
//!
//! Optional chain extension between the charter and the contract.

use async_trait::async_trait;
use std::sync::Arc;

use super::{artifacts, context_block, keys, Upstream};
use crate::adk::agent::Agent;
use crate::adk::error::ProcureError;
use crate::procure::services::ArtifactStore;
use crate::procure::workflow::state::{ProcurementState, StateUpdate};
use crate::procure::workflow::step::Step;

/// Read the three analysis documents every correspondence step needs
async fn analysis_context(
    state: &ProcurementState,
    store: &dyn ArtifactStore,
) -> Result<Vec<(&'static str, String)>, ProcureError> {
    let mut documents = Vec::new();
    for upstream in [Upstream::RFP_ANALYSIS, Upstream::PRICING_RISK, Upstream::CHARTER] {
        documents.push((upstream.file, upstream.require(state, store).await?));
    }
    Ok(documents)
}

/// Writes the opening negotiation email to suppliers
pub struct NegotiationEmailStep {
    writer: Arc<dyn Agent>,
    artifacts: Arc<dyn ArtifactStore>,
}

impl NegotiationEmailStep {
    pub fn new(writer: Arc<dyn Agent>, artifacts: Arc<dyn ArtifactStore>) -> Self {
        Self { writer, artifacts }
    }
}

#[async_trait]
impl Step for NegotiationEmailStep {
    async fn execute(
        &self,
        name: &str,
        state: &ProcurementState,
    ) -> Result<StateUpdate, ProcureError> {
        let documents = analysis_context(state, self.artifacts.as_ref()).await?;
        let prompt = format!(
            "Based on the analysis below, write a professional and strategic supplier \
             negotiation email.\n\n---\n{}---\n\n\
             Structure: Subject, Salutation, Introduction referencing the proposal and \
             evaluation, Key Findings (pricing competitiveness, risk factors, value \
             proposition), Areas for Negotiation (price, contract flexibility, SLAs, \
             added value), Call to Action. Keep a formal tone.",
            context_block(&documents)
        );

        let email = self.writer.run(prompt).await?;
        let path = self
            .artifacts
            .save(&email, artifacts::NEGOTIATION_EMAIL)
            .await?;

        Ok(StateUpdate::completed(name)
            .with_output_file(path.to_string_lossy())
            .with_data(keys::NEGOTIATION_EMAIL, email))
    }
}

/// Prepares counteroffers to expected supplier replies, then the follow-up
/// email presenting them
pub struct CounterOfferStep {
    strategist: Arc<dyn Agent>,
    writer: Arc<dyn Agent>,
    artifacts: Arc<dyn ArtifactStore>,
}

impl CounterOfferStep {
    pub fn new(
        strategist: Arc<dyn Agent>,
        writer: Arc<dyn Agent>,
        artifacts: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            strategist,
            writer,
            artifacts,
        }
    }
}

#[async_trait]
impl Step for CounterOfferStep {
    async fn execute(
        &self,
        name: &str,
        state: &ProcurementState,
    ) -> Result<StateUpdate, ProcureError> {
        let store = self.artifacts.as_ref();
        let mut documents = analysis_context(state, store).await?;
        let first_email = Upstream::NEGOTIATION_EMAIL.require(state, store).await?;
        documents.push((Upstream::NEGOTIATION_EMAIL.file, first_email.clone()));

        let strategy = self
            .strategist
            .run(format!(
                "Based on the documents below, generate strategic counteroffers to the \
                 supplier responses we should expect.\n\n---\n{}---\n\n\
                 Present them as a markdown table with the columns \
                 | Expected Supplier Response | Counteroffer Strategy |. \
                 Keep them aligned with business objectives, persuasive and realistic.",
                context_block(&documents)
            ))
            .await?;
        self.artifacts
            .save(&strategy, artifacts::COUNTER_OFFER_STRATEGY)
            .await?;

        let email = self
            .writer
            .run(format!(
                "Write the final supplier negotiation email. Acknowledge previous \
                 discussions, present the refined counteroffers with justification and \
                 close with a strong call to action.\n\n\
                 Initial negotiation email:\n{}\n\nStrategic counteroffers:\n{}",
                first_email, strategy
            ))
            .await?;
        let path = self
            .artifacts
            .save(&email, artifacts::COUNTER_OFFER_EMAIL)
            .await?;

        Ok(StateUpdate::completed(name)
            .with_output_file(path.to_string_lossy())
            .with_data(keys::COUNTER_OFFER_STRATEGY, strategy)
            .with_data(keys::COUNTER_OFFER_EMAIL, email))
    }
}
