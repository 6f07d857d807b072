// SPDX-License-Identifier: MIT

//! Step status values

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a step in the shared state.
///
/// Valid transitions:
/// - `Pending` -> `Completed`
/// - `Pending` -> `Failed`
///
/// A terminal status only goes back to `Pending` through an explicit reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

impl StepStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, StepStatus::Completed | StepStatus::Failed)
    }

    /// Whether a natural run may move from `self` to `next`
    pub fn can_transition_to(self, next: StepStatus) -> bool {
        self == next || self == StepStatus::Pending
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Completed => "completed",
            StepStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
