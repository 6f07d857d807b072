// SPDX-License-Identifier: MIT

//! Legal review of the drafted contract against the negotiation record

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{artifacts, context_block, keys, Upstream};
use crate::adk::agent::Agent;
use crate::adk::error::ProcureError;
use crate::procure::services::structured::{format_as_list, format_instructions, parse_as, TextBlock};
use crate::procure::services::ArtifactStore;
use crate::procure::workflow::state::{ProcurementState, StateUpdate};
use crate::procure::workflow::step::Step;

/// Structured answer of the legal reviewer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ContractReview {
    /// List of key deviations and discrepancies found
    pub key_deviations: TextBlock,
    /// Detailed correction recommendations
    pub recommended_corrections: TextBlock,
    /// Overall review conclusion: Acceptable, Minor Fixes, or Major Revisions
    pub final_verdict: String,
}

/// Render a review as the markdown report saved to disk
pub fn render_review(review: &ContractReview) -> String {
    format!(
        "# Contract Review Report\n\n\
         ## Key Deviations Identified\n{}\n\n\
         ## Recommended Corrections\n{}\n\n\
         ## Final Verdict\n**{}**\n",
        format_as_list(&review.key_deviations.to_text()),
        format_as_list(&review.recommended_corrections.to_text()),
        review.final_verdict.trim()
    )
}

pub struct LegalReviewStep {
    reviewer: Arc<dyn Agent>,
    artifacts: Arc<dyn ArtifactStore>,
}

impl LegalReviewStep {
    pub fn new(reviewer: Arc<dyn Agent>, artifacts: Arc<dyn ArtifactStore>) -> Self {
        Self {
            reviewer,
            artifacts,
        }
    }
}

#[async_trait]
impl Step for LegalReviewStep {
    async fn execute(
        &self,
        name: &str,
        state: &ProcurementState,
    ) -> Result<StateUpdate, ProcureError> {
        let store = self.artifacts.as_ref();
        let contract = Upstream::CONTRACT.require(state, store).await?;

        let mut references = Vec::new();
        for upstream in [
            Upstream::RFP_ANALYSIS,
            Upstream::PRICING_RISK,
            Upstream::CHARTER,
            Upstream::NEGOTIATION_EMAIL,
            Upstream::COUNTER_OFFER_EMAIL,
            Upstream::COUNTER_OFFER_STRATEGY,
        ] {
            if let Some(text) = upstream.optional(state, store).await? {
                references.push((upstream.file, text));
            }
        }

        let prompt = format!(
            "Review the final contract against the negotiation documents. Highlight \
             deviations, missing clauses, risks and non-compliance in: pricing & payment \
             terms, SLAs, negotiated benefits, regulatory compliance, dispute resolution, \
             and exit clauses.\n\n\
             ## Reference negotiation documents\n{}\n\
             ## Final contract\n```markdown\n{}\n```\n\n{}",
            context_block(&references),
            contract,
            format_instructions::<ContractReview>()
        );

        let reply = self.reviewer.run(prompt).await?;
        let review: ContractReview = parse_as(&reply)?;
        let report = render_review(&review);
        let path = self
            .artifacts
            .save(&report, artifacts::CONTRACT_REVIEW)
            .await?;
        log::info!("Legal review verdict: {}", review.final_verdict);

        Ok(StateUpdate::completed(name)
            .with_output_file(path.to_string_lossy())
            .with_data(keys::REVIEW_FEEDBACK, report)
            .with_data(keys::FINAL_VERDICT, review.final_verdict))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::procure::steps::test_support::{store, ScriptedAgent};
    use crate::procure::workflow::state::StepStatus;
    use tempfile::tempdir;

    const REVIEW_JSON: &str = r#"{
        "key_deviations": "Missing price protection clause\n- SLA penalties absent",
        "recommended_corrections": ["Add a 5% annual cap", "* Add SLA credits"],
        "final_verdict": "Minor Fixes"
    }"#;

    fn contracted_state() -> ProcurementState {
        let mut state = ProcurementState::default();
        state
            .merge(StateUpdate::completed("ContractGenerator").with_data(keys::DRAFT_CONTRACT, "# MSA"))
            .unwrap();
        state
    }

    #[test]
    fn test_render_review() {
        let review: ContractReview = parse_as(REVIEW_JSON).unwrap();
        let report = render_review(&review);

        assert!(report.contains(
            "## Key Deviations Identified\n- Missing price protection clause\n- SLA penalties absent"
        ));
        assert!(report.contains("- Add a 5% annual cap\n* Add SLA credits"));
        assert!(report.contains("## Final Verdict\n**Minor Fixes**"));
    }

    #[tokio::test]
    async fn test_review_completes() {
        let dir = tempdir().unwrap();
        let reviewer = ScriptedAgent::replying(&[REVIEW_JSON]);
        let step = LegalReviewStep::new(reviewer.clone(), store(dir.path()));
        let mut state = contracted_state();

        let update = step.run("LegalReview", &state).await;
        state.merge(update).unwrap();

        assert!(state.is_completed("LegalReview"));
        assert_eq!(state.get_str(keys::FINAL_VERDICT), Some("Minor Fixes"));
        assert!(state
            .get_str(keys::REVIEW_FEEDBACK)
            .unwrap()
            .starts_with("# Contract Review Report"));
        assert!(reviewer.last_input().contains("```markdown\n# MSA\n```"));
    }

    #[tokio::test]
    async fn test_non_json_reply_fails() {
        let dir = tempdir().unwrap();
        let step = LegalReviewStep::new(
            ScriptedAgent::replying(&["The contract looks fine to me."]),
            store(dir.path()),
        );
        let mut state = contracted_state();

        let update = step.run("LegalReview", &state).await;
        state.merge(update).unwrap();

        assert_eq!(state.status("LegalReview"), StepStatus::Failed);
        assert!(!dir.path().join("7.contract_review.md").exists());
    }

    #[tokio::test]
    async fn test_missing_contract_fails() {
        let dir = tempdir().unwrap();
        let reviewer = ScriptedAgent::replying(&[REVIEW_JSON]);
        let step = LegalReviewStep::new(reviewer.clone(), store(dir.path()));
        let mut state = ProcurementState::default();

        let update = step.run("LegalReview", &state).await;
        state.merge(update).unwrap();

        assert_eq!(state.status("LegalReview"), StepStatus::Failed);
        assert_eq!(reviewer.calls(), 0);
    }
}
