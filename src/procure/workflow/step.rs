// SPDX-License-Identifier: MIT

//! Step trait - a unit of work over the shared state

use async_trait::async_trait;

use crate::adk::error::ProcureError;
use crate::procure::workflow::state::{ProcurementState, StateUpdate, StepStatus};

/// A named transformation of the shared state.
///
/// Implementors only write `execute`. `run` wraps it with the skip check
/// and the failure boundary: a step that is already terminal returns an
/// empty update, and an error from `execute` becomes a `failed` status
/// instead of escaping the step.
#[async_trait]
pub trait Step: Send + Sync {
    /// Do the step's work and describe the resulting state change
    async fn execute(
        &self,
        name: &str,
        state: &ProcurementState,
    ) -> Result<StateUpdate, ProcureError>;

    /// Run the step under the name it was registered with
    async fn run(&self, name: &str, state: &ProcurementState) -> StateUpdate {
        match state.status(name) {
            StepStatus::Completed => {
                log::info!("Step {} already completed, skipping", name);
                return StateUpdate::unchanged(name);
            }
            StepStatus::Failed => {
                log::warn!(
                    "Step {} is marked failed; reset it explicitly to rerun",
                    name
                );
                return StateUpdate::unchanged(name);
            }
            StepStatus::Pending => {}
        }

        log::info!("Step {} starting", name);
        match self.execute(name, state).await {
            Ok(update) => update,
            Err(e) => {
                log::error!("Step {} failed: {}", name, e);
                StateUpdate::failed(name, e.to_string())
            }
        }
    }
}
