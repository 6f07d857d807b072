// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use super::{inputs, keys};
use crate::adk::error::ProcureError;
use crate::procure::services::DocumentIngestor;
use crate::procure::workflow::state::{ProcurementState, StateUpdate};
use crate::procure::workflow::step::Step;

/// Ingests the supplier proposals named by `input_files.proposal_pdfs`
pub struct ProposalProcessorStep {
    ingestor: Arc<dyn DocumentIngestor>,
}

impl ProposalProcessorStep {
    pub fn new(ingestor: Arc<dyn DocumentIngestor>) -> Self {
        Self { ingestor }
    }
}

#[async_trait]
impl Step for ProposalProcessorStep {
    async fn execute(
        &self,
        name: &str,
        state: &ProcurementState,
    ) -> Result<StateUpdate, ProcureError> {
        let dir = state.input_file(inputs::PROPOSAL_PDFS).ok_or_else(|| {
            ProcureError::config(format!("input_files.{} is not set", inputs::PROPOSAL_PDFS))
        })?;

        let report = self.ingestor.ingest(Path::new(dir)).await?;
        if !report.is_success() {
            return Err(ProcureError::collaborator(
                "ingestion",
                format!("no proposal chunks could be stored from {}", dir),
            ));
        }

        log::info!(
            "Ingested {} proposals ({} chunks) from {}",
            report.processed_files,
            report.chunks,
            dir
        );
        Ok(StateUpdate::completed(name)
            .with_data(keys::PROCESSED_FILES, report.processed_files)
            .with_data(keys::PROPOSAL_FILES, report.files))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::procure::services::{IngestReport, IngestStatus};
    use crate::procure::workflow::state::StepStatus;
    use serde_json::json;

    struct FixedIngestor(IngestReport);

    #[async_trait]
    impl DocumentIngestor for FixedIngestor {
        async fn ingest(&self, _dir: &Path) -> Result<IngestReport, ProcureError> {
            Ok(self.0.clone())
        }
    }

    fn seeded() -> ProcurementState {
        ProcurementState::default().with_input(inputs::PROPOSAL_PDFS, "./fixtures/two_pdfs/")
    }

    #[tokio::test]
    async fn test_success_completes_with_file_list() {
        let step = ProposalProcessorStep::new(Arc::new(FixedIngestor(IngestReport {
            status: IngestStatus::Success,
            processed_files: 2,
            chunks: 6,
            files: vec!["a.pdf".to_string(), "b.pdf".to_string()],
        })));
        let mut state = seeded();

        let update = step.run("ProposalProcessor", &state).await;
        state.merge(update).unwrap();

        assert!(state.is_completed("ProposalProcessor"));
        assert_eq!(state.get(keys::PROCESSED_FILES), Some(&json!(2)));
        assert_eq!(state.get(keys::PROPOSAL_FILES), Some(&json!(["a.pdf", "b.pdf"])));
    }

    #[tokio::test]
    async fn test_failure_status_marks_failed() {
        let step = ProposalProcessorStep::new(Arc::new(FixedIngestor(IngestReport::failure())));
        let mut state = seeded();

        let update = step.run("ProposalProcessor", &state).await;
        state.merge(update).unwrap();

        assert_eq!(state.status("ProposalProcessor"), StepStatus::Failed);
        assert!(state.error("ProposalProcessor").unwrap().contains("ingestion"));
    }

    #[tokio::test]
    async fn test_missing_input_key_fails() {
        let step = ProposalProcessorStep::new(Arc::new(FixedIngestor(IngestReport::failure())));
        let mut state = ProcurementState::default();

        let update = step.run("ProposalProcessor", &state).await;
        state.merge(update).unwrap();

        assert!(state
            .error("ProposalProcessor")
            .unwrap()
            .contains("proposal_pdfs"));
    }
}
