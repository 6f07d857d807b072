// SPDX-License-Identifier: MIT

//! Comparative analysis of the indexed supplier proposals

use async_trait::async_trait;
use std::sync::Arc;

use super::{artifacts, keys};
use crate::adk::agent::Agent;
use crate::adk::error::ProcureError;
use crate::procure::services::{ArtifactStore, ProposalIndex};
use crate::procure::workflow::state::{ProcurementState, StateUpdate};
use crate::procure::workflow::step::Step;

const PROFILE_SECTIONS: &str = "\
## Supplier Profile
- Company Name, Headquarters, Contact Person & Email, Website, Years of Experience, Industries Served

## Solution Overview
- Solution Name, Main Objective, Key Features, AI/ML Capabilities, Technology Stack, Multi-Cloud Compatibility

## Pricing & Licensing
- Base Monthly Price, Additional Costs, Enterprise Plan Details, Discounts, Implementation/Setup Fee, Contract Lock-in Period

## Key Features & Capabilities
- Security & Compliance, Cloud Orchestration, Support & SLAs, Implementation Timeline

## Risk Assessment
- Pricing Risk, Delivery Risk, Contract Risk, Compliance Risk, Overall Score

## Negotiation Opportunities
- Weaknesses to leverage for better pricing and contract terms

## Recommendation
- Key justifications and next steps";

const REPORT_SECTIONS: &str = "\
## Executive Summary
## Supplier Strengths & Weaknesses
## Overall Supplier Ranking
| Supplier | Technical Fit (10) | Pricing & Cost (10) | SLAs & Support (10) | Compliance (10) | Overall Score |
## Key Differences Between Suppliers
## Risk Assessment
## Negotiation & Optimization Strategies
## Final Recommendation";

/// Extracts each supplier's proposal details, then writes one comparison
/// report across all of them
pub struct RfpAnalysisStep {
    index: Arc<dyn ProposalIndex>,
    extractor: Arc<dyn Agent>,
    writer: Arc<dyn Agent>,
    artifacts: Arc<dyn ArtifactStore>,
}

impl RfpAnalysisStep {
    pub fn new(
        index: Arc<dyn ProposalIndex>,
        extractor: Arc<dyn Agent>,
        writer: Arc<dyn Agent>,
        artifacts: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            index,
            extractor,
            writer,
            artifacts,
        }
    }

    fn extraction_prompt(supplier: &str, documents: &[String]) -> String {
        format!(
            "Extract structured information from the supplier proposal for {}.\n\n\
             Return the details in this markdown structure:\n\n{}\n\n\
             Proposal data:\n```\n{}\n```",
            supplier,
            PROFILE_SECTIONS,
            documents.join("\n")
        )
    }

    fn report_prompt(profiles: &[(String, String)]) -> String {
        let comparison = profiles
            .iter()
            .map(|(supplier, profile)| format!("## {}\n{}", supplier, profile))
            .collect::<Vec<_>>()
            .join("\n\n");
        format!(
            "Generate a detailed supplier proposal evaluation report in professional markdown \
             based on the extracted data below.\n\n{}\n\n---\nUse these sections:\n{}",
            comparison, REPORT_SECTIONS
        )
    }
}

#[async_trait]
impl Step for RfpAnalysisStep {
    async fn execute(
        &self,
        name: &str,
        _state: &ProcurementState,
    ) -> Result<StateUpdate, ProcureError> {
        let suppliers = self.index.suppliers().await?;
        let mut profiles = Vec::new();

        for supplier in &suppliers {
            let documents = self.index.documents_for(supplier).await?;
            if documents.is_empty() {
                log::warn!("No data found for {}, skipping", supplier);
                continue;
            }
            log::info!("Processing {}...", supplier);
            let profile = self
                .extractor
                .run(Self::extraction_prompt(supplier, &documents))
                .await?;
            profiles.push((supplier.clone(), profile));
        }

        if profiles.is_empty() {
            return Err(ProcureError::collaborator(
                "proposal index",
                "no valid supplier proposals found",
            ));
        }

        let report = self.writer.run(Self::report_prompt(&profiles)).await?;
        let path = self.artifacts.save(&report, artifacts::RFP_ANALYSIS).await?;

        let analysed: Vec<String> = profiles.into_iter().map(|(s, _)| s).collect();
        Ok(StateUpdate::completed(name)
            .with_output_file(path.to_string_lossy())
            .with_data(keys::RFP_ANALYSIS, report)
            .with_data(keys::SUPPLIERS, analysed))
    }
}
