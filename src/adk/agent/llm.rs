// SPDX-License-Identifier: MIT

//! LLM Agent - single-turn generation agent
//!
//! Sends the role instruction and one user message to the model and
//! returns the text answer. An empty answer is a collaborator failure.

use super::Agent;
use crate::adk::error::ProcureError;
use crate::adk::model::{Content, GenerationConfig, Model};
use async_trait::async_trait;
use std::sync::Arc;

/// Standard LLM agent
pub struct LLMAgent {
    pub name: String,
    pub instruction: String,
    pub model: Arc<dyn Model>,
    pub config: GenerationConfig,
}

impl LLMAgent {
    pub fn new(
        name: impl Into<String>,
        instruction: impl Into<String>,
        model: Arc<dyn Model>,
        temperature: f32,
    ) -> Self {
        Self {
            name: name.into(),
            instruction: instruction.into(),
            model,
            config: GenerationConfig::with_temperature(temperature),
        }
    }
}

#[async_trait]
impl Agent for LLMAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, input: String) -> Result<String, ProcureError> {
        let history = vec![Content::system(self.instruction.clone()), Content::user(input)];

        log::info!("Agent {} generating", self.name);
        let response = self
            .model
            .generate_content(&history, Some(&self.config))
            .await?;

        let text = response.text();
        if text.trim().is_empty() {
            log::warn!("Agent {} received empty response", self.name);
            return Err(ProcureError::collaborator(&self.name, "empty model response"));
        }

        log::info!(
            "Agent {} returning text response (length: {}, preview: '{}')",
            self.name,
            text.len(),
            text.chars().take(100).collect::<String>()
        );
        Ok(text)
    }
}
