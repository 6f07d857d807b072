// SPDX-License-Identifier: MIT

//! Negotiation charter: price forecast from supply/demand history, then a
//! strategy document built on that forecast

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use super::{artifacts, inputs, keys};
use crate::adk::agent::Agent;
use crate::adk::error::ProcureError;
use crate::procure::data::load_supply_demand;
use crate::procure::services::structured::{format_instructions, parse_as};
use crate::procure::services::ArtifactStore;
use crate::procure::workflow::state::{ProcurementState, StateUpdate};
use crate::procure::workflow::step::Step;

#[derive(Debug, Deserialize, JsonSchema)]
struct PriceForecast {
    /// Service names mapped to forecast price percentage changes for the
    /// next four quarters
    forecast: Value,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct CharterReply {
    /// A structured markdown document with price forecasts, risk analysis
    /// and negotiation strategy
    negotiation_charter: String,
}

pub struct NegotiationCharterStep {
    forecaster: Arc<dyn Agent>,
    strategist: Arc<dyn Agent>,
    artifacts: Arc<dyn ArtifactStore>,
}

impl NegotiationCharterStep {
    pub fn new(
        forecaster: Arc<dyn Agent>,
        strategist: Arc<dyn Agent>,
        artifacts: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            forecaster,
            strategist,
            artifacts,
        }
    }

    async fn forecast(&self, history: &str) -> Result<Value, ProcureError> {
        let prompt = format!(
            "Given the historical supply-demand data below, predict the price percentage \
             change of every service for each of the next four quarters. Consider \
             seasonality and demand fluctuations.\n\n\
             Historical data:\n```json\n{}\n```\n\n{}",
            history,
            format_instructions::<PriceForecast>()
        );
        let reply = self.forecaster.run(prompt).await?;
        Ok(parse_as::<PriceForecast>(&reply)?.forecast)
    }

    async fn charter(&self, forecast: &Value) -> Result<String, ProcureError> {
        let prompt = format!(
            "Based on the forecast price changes below, write a Negotiation Charter in \
             markdown with these sections:\n\
             1. Price Forecast Analysis\n\
             2. Cost Optimization Strategy\n\
             3. Supplier Risk Analysis\n\
             4. Supplier Comparison Table (Supplier | Service | Current Price | Forecasted Price Change | Risk Level)\n\
             5. Negotiation Leverage Points\n\
             6. Negotiation Recommendations\n\n\
             Forecast price changes:\n```json\n{}\n```\n\n{}",
            serde_json::to_string_pretty(forecast)?,
            format_instructions::<CharterReply>()
        );
        let reply = self.strategist.run(prompt).await?;
        Ok(parse_as::<CharterReply>(&reply)?.negotiation_charter)
    }
}

#[async_trait]
impl Step for NegotiationCharterStep {
    async fn execute(
        &self,
        name: &str,
        state: &ProcurementState,
    ) -> Result<StateUpdate, ProcureError> {
        let path = state.input_file(inputs::SUPPLY_DEMAND).ok_or_else(|| {
            ProcureError::config(format!("input_files.{} is not set", inputs::SUPPLY_DEMAND))
        })?;

        let history = load_supply_demand(path);
        if history.is_empty() {
            return Err(ProcureError::data_format(format!(
                "no valid supply/demand history found in {}",
                path
            )));
        }

        let forecast = self.forecast(&serde_json::to_string_pretty(&history)?).await?;
        let charter = self.charter(&forecast).await?;
        let path = self
            .artifacts
            .save(&charter, artifacts::NEGOTIATION_CHARTER)
            .await?;

        Ok(StateUpdate::completed(name)
            .with_output_file(path.to_string_lossy())
            .with_data(keys::PRICE_FORECAST, forecast)
            .with_data(keys::NEGOTIATION_CHARTER, charter))
    }
}
