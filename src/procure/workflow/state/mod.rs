// SPDX-License-Identifier: MIT

//! Shared state for procurement workflows
//!
//! This module provides:
//! - `ProcurementState` - the record threaded through every step
//! - `StateUpdate` - a step's partial output, merged by the executor
//! - `StepStatus` - per-step status with guarded transitions

mod status;
mod store;

pub use status::StepStatus;
pub use store::{ProcurementState, StateUpdate};
