// SPDX-License-Identifier: MIT

//! OpenAI Model - chat completions API implementation

use super::{Content, GenerationConfig, Model, Part};
use crate::adk::error::{ModelError, ProcureError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::env;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI chat model implementation
pub struct OpenAIModel {
    client: Client,
    api_key: String,
    model_name: String,
    base_url: String,
}

impl OpenAIModel {
    /// Create a new OpenAIModel
    ///
    /// Requires `OPENAI_API_KEY` environment variable to be set.
    pub fn new(model_name: String, base_url: String) -> Result<Self, ProcureError> {
        let api_key = env::var("OPENAI_API_KEY")
            .map_err(|_| ModelError::ApiKeyMissing("OpenAI".to_string()))?;

        Ok(Self {
            client: Client::new(),
            api_key,
            model_name,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Convert internal Content to OpenAI message format
    fn content_to_openai_message(content: &Content) -> serde_json::Value {
        let role = match content.role.as_str() {
            "system" => "system",
            "user" => "user",
            "model" => "assistant",
            other => other,
        };

        let text: String = content
            .parts
            .iter()
            .map(|p| match p {
                Part::Text(t) | Part::Thinking(t) => t.as_str(),
            })
            .collect();

        json!({
            "role": role,
            "content": text
        })
    }

    fn request_body(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
    ) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = history
            .iter()
            .map(Self::content_to_openai_message)
            .collect();

        let mut body = json!({
            "model": self.model_name,
            "messages": messages
        });

        if let Some(cfg) = config {
            if let Some(temp) = cfg.temperature {
                body["temperature"] = json!(temp);
            }
            if let Some(max_tokens) = cfg.max_output_tokens {
                body["max_tokens"] = json!(max_tokens);
            }
            if let Some(top_p) = cfg.top_p {
                body["top_p"] = json!(top_p);
            }
        }

        body
    }

    /// Parse OpenAI response into Content
    fn parse_openai_response(response: &serde_json::Value) -> Result<Content, ProcureError> {
        let choice = response["choices"]
            .as_array()
            .and_then(|c| c.first())
            .ok_or_else(|| ModelError::InvalidResponse("no choices in response".to_string()))?;

        let mut parts = Vec::new();
        if let Some(content) = choice["message"]["content"].as_str() {
            if !content.is_empty() {
                parts.push(Part::Text(content.to_string()));
            }
        }

        Ok(Content {
            role: "model".to_string(),
            parts,
        })
    }
}

#[async_trait]
impl Model for OpenAIModel {
    async fn generate_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
    ) -> Result<Content, ProcureError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(history, config);

        log::debug!(
            "OpenAI request body: {}",
            serde_json::to_string_pretty(&body).unwrap_or_default()
        );

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await?;
            return Err(ModelError::Api {
                provider: "OpenAI".to_string(),
                status: status.as_u16(),
                body: text,
            }
            .into());
        }

        let resp_json: serde_json::Value = resp.json().await?;
        log::debug!("OpenAI response: {}", resp_json);

        Self::parse_openai_response(&resp_json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn model() -> OpenAIModel {
        OpenAIModel {
            client: Client::new(),
            api_key: "test".to_string(),
            model_name: "gpt-4o-mini".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    #[test]
    fn test_content_to_openai_system_message() {
        let msg = OpenAIModel::content_to_openai_message(&Content::system("You are a reviewer"));
        assert_eq!(msg["role"], "system");
        assert_eq!(msg["content"], "You are a reviewer");
    }

    #[test]
    fn test_content_to_openai_assistant_message() {
        let content = Content {
            role: "model".to_string(),
            parts: vec![Part::Text("Draft ready".to_string())],
        };

        let msg = OpenAIModel::content_to_openai_message(&content);
        assert_eq!(msg["role"], "assistant");
        assert_eq!(msg["content"], "Draft ready");
    }

    #[test]
    fn test_request_body_carries_temperature() {
        let body = model().request_body(
            &[Content::system("sys"), Content::user("hi")],
            Some(&GenerationConfig::with_temperature(0.5)),
        );

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"].as_array().unwrap().len(), 2);
        assert_eq!(body["temperature"], json!(0.5));
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_parse_openai_text_response() {
        let response = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "# Contract"
                }
            }]
        });

        let content = OpenAIModel::parse_openai_response(&response).unwrap();
        assert_eq!(content.role, "model");
        assert_eq!(content.text(), "# Contract");
    }

    #[test]
    fn test_parse_openai_response_without_choices() {
        let result = OpenAIModel::parse_openai_response(&json!({"choices": []}));
        assert!(matches!(
            result,
            Err(ProcureError::Model(ModelError::InvalidResponse(_)))
        ));
    }
}
