// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;

use super::{artifacts, inputs, keys};
use crate::adk::agent::Agent;
use crate::adk::error::ProcureError;
use crate::procure::data::load_pricing_history;
use crate::procure::services::structured::{format_instructions, markdown_field_or_raw};
use crate::procure::services::ArtifactStore;
use crate::procure::workflow::state::{ProcurementState, StateUpdate};
use crate::procure::workflow::step::Step;

#[derive(Debug, Deserialize, JsonSchema)]
#[allow(dead_code)]
struct PricingRiskReply {
    /// A structured markdown report analysing pricing trends, risks and
    /// strategic recommendations
    pricing_risk_report: String,
}

/// Turns the historical pricing CSV into a pricing risk report
pub struct PricingRiskStep {
    analyst: Arc<dyn Agent>,
    artifacts: Arc<dyn ArtifactStore>,
}

impl PricingRiskStep {
    pub fn new(analyst: Arc<dyn Agent>, artifacts: Arc<dyn ArtifactStore>) -> Self {
        Self { analyst, artifacts }
    }
}

#[async_trait]
impl Step for PricingRiskStep {
    async fn execute(
        &self,
        name: &str,
        state: &ProcurementState,
    ) -> Result<StateUpdate, ProcureError> {
        let path = state.input_file(inputs::PRICING_HISTORY).ok_or_else(|| {
            ProcureError::config(format!("input_files.{} is not set", inputs::PRICING_HISTORY))
        })?;

        let history = load_pricing_history(path);
        if history.is_empty() {
            return Err(ProcureError::data_format(format!(
                "no valid pricing history found in {}",
                path
            )));
        }

        let prompt = format!(
            "Based on the historical pricing data below, write a Pricing Risk Analysis Report \
             in markdown with these sections:\n\
             1. Historical Price Trends\n\
             2. Market Risks & Opportunities\n\
             3. Supplier Risk Assessment\n\
             4. Future Price Predictions (next 4 quarters, with confidence levels)\n\
             5. Strategic Recommendations\n\n\
             Pricing data:\n```json\n{}\n```\n\n{}",
            serde_json::to_string_pretty(&history)?,
            format_instructions::<PricingRiskReply>()
        );

        let reply = self.analyst.run(prompt).await?;
        let report = markdown_field_or_raw(&reply, keys::PRICING_RISK_REPORT);
        let path = self.artifacts.save(&report, artifacts::PRICING_RISK).await?;

        Ok(StateUpdate::completed(name)
            .with_output_file(path.to_string_lossy())
            .with_data(keys::PRICING_RISK_REPORT, report))
    }
}
