// SPDX-License-Identifier: MIT

//! Runtime settings
//!
//! Settings come from serde defaults, an optional YAML file, and then
//! environment overrides. CLI flags are applied last by the binary.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::adk::error::ProcureError;
use crate::adk::model::openai::DEFAULT_BASE_URL;
use crate::procure::workflow::graph::FailurePolicy;

/// Settings for one procurement run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding the supplier proposal PDFs
    pub proposals_dir: PathBuf,
    pub pricing_history: PathBuf,
    pub supply_demand: PathBuf,
    /// Where markdown artifacts are written
    pub output_dir: PathBuf,
    /// JSON file the proposal index is persisted to between runs
    pub index_path: PathBuf,
    pub model: String,
    pub base_url: String,
    pub failure_policy: FailurePolicy,
    /// Pre-mark ProposalProcessor as completed
    pub skip_ingestion: bool,
    /// Add NegotiationEmail and CounterOffer to the chain
    pub include_correspondence: bool,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            proposals_dir: PathBuf::from("./data/proposals/"),
            pricing_history: PathBuf::from("./data/pricing_history/historical_pricing.csv"),
            supply_demand: PathBuf::from("./data/demand_data/supply_demand.csv"),
            output_dir: PathBuf::from("./outputs"),
            index_path: PathBuf::from("./data/proposal_index.json"),
            model: "gpt-4o-mini".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            failure_policy: FailurePolicy::default(),
            skip_ingestion: false,
            include_correspondence: false,
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

impl Settings {
    /// Load settings from an optional YAML file, then apply env overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ProcureError> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.apply_env()?;
        Ok(settings)
    }

    /// Load settings from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ProcureError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ProcureError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::parse_yaml(&content)
    }

    /// Parse settings from a YAML string; missing keys keep their defaults
    pub fn parse_yaml(content: &str) -> Result<Self, ProcureError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) -> Result<(), ProcureError> {
        self.apply_env_from(|key| env::var(key).ok())
    }

    /// Apply overrides from any key lookup
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ProcureError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = get("PROCURE_PROPOSALS_DIR") {
            self.proposals_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get("PROCURE_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(model) = get("PROCURE_MODEL") {
            self.model = model;
        }
        if let Some(url) = get("OPENAI_BASE_URL") {
            self.base_url = url;
        }
        if let Some(flag) = get("SKIP_VECTORIZER") {
            self.skip_ingestion = flag.trim() == "true";
        }
        if let Some(policy) = get("PROCURE_FAILURE_POLICY") {
            self.failure_policy = policy.parse()?;
        }
        Ok(())
    }

    /// Check settings that would otherwise fail deep inside a run
    pub fn validate(&self) -> Result<(), ProcureError> {
        url::Url::parse(&self.base_url).map_err(|e| {
            ProcureError::config(format!("invalid base_url '{}': {}", self.base_url, e))
        })?;

        if self.chunk_size == 0 {
            return Err(ProcureError::config("chunk_size must be greater than zero"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ProcureError::config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.model.trim().is_empty() {
            return Err(ProcureError::config("model name is empty"));
        }
        Ok(())
    }
}
