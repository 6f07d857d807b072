// SPDX-License-Identifier: MIT

//! Runtime state storage for workflow execution

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::status::StepStatus;
use crate::adk::error::StateError;

/// The record threaded through every step of a run.
///
/// `input_files`, `output_files` and `steps` are the three mappings every
/// step agrees on. `data` carries the domain payload one step hands to the
/// next, and `errors` records why a step failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcurementState {
    input_files: BTreeMap<String, String>,
    #[serde(default)]
    output_files: BTreeMap<String, String>,
    #[serde(default)]
    steps: BTreeMap<String, StepStatus>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    data: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    errors: BTreeMap<String, String>,
}

impl ProcurementState {
    /// Create a state seeded with input files
    pub fn new(input_files: BTreeMap<String, String>) -> Self {
        Self {
            input_files,
            ..Default::default()
        }
    }

    /// Builder-style input seeding
    pub fn with_input(mut self, key: impl Into<String>, path: impl Into<String>) -> Self {
        self.set_input(key, path);
        self
    }

    /// Operator override of an input path before the run
    pub fn set_input(&mut self, key: impl Into<String>, path: impl Into<String>) {
        self.input_files.insert(key.into(), path.into());
    }

    /// Operator skip flag: mark a step as already completed
    pub fn mark_completed(&mut self, step: impl Into<String>) {
        self.steps.insert(step.into(), StepStatus::Completed);
    }

    /// Operator rerun: put a step back to pending so its next run executes
    pub fn reset_step(&mut self, step: &str) {
        if self.steps.contains_key(step) {
            self.steps.insert(step.to_string(), StepStatus::Pending);
        }
        self.errors.remove(step);
    }

    pub fn input_file(&self, key: &str) -> Option<&str> {
        self.input_files.get(key).map(String::as_str)
    }

    pub fn output_file(&self, step: &str) -> Option<&str> {
        self.output_files.get(step).map(String::as_str)
    }

    /// Status of a step; absence means pending
    pub fn status(&self, step: &str) -> StepStatus {
        self.steps.get(step).copied().unwrap_or_default()
    }

    pub fn is_completed(&self, step: &str) -> bool {
        self.status(step) == StepStatus::Completed
    }

    /// Get a payload value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Get a payload value as a string slice
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    pub fn error(&self, step: &str) -> Option<&str> {
        self.errors.get(step).map(String::as_str)
    }

    pub fn input_files(&self) -> &BTreeMap<String, String> {
        &self.input_files
    }

    pub fn output_files(&self) -> &BTreeMap<String, String> {
        &self.output_files
    }

    pub fn steps(&self) -> &BTreeMap<String, StepStatus> {
        &self.steps
    }

    pub fn data(&self) -> &BTreeMap<String, Value> {
        &self.data
    }

    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    /// Merge a step's partial output as a shallow union.
    ///
    /// Keys in the update overwrite, keys absent from it are kept, nothing is
    /// removed. The status transition is checked before anything is written,
    /// so a rejected update leaves the state untouched.
    pub fn merge(&mut self, update: StateUpdate) -> Result<(), StateError> {
        let StateUpdate {
            step,
            status,
            output_file,
            data,
            error,
        } = update;

        if let Some(next) = status {
            let current = self.status(&step);
            if !current.can_transition_to(next) {
                return Err(StateError::IllegalTransition {
                    step,
                    from: current.to_string(),
                    to: next.to_string(),
                });
            }
            self.steps.insert(step.clone(), next);
        }

        if let Some(path) = output_file {
            self.output_files.insert(step.clone(), path);
        }

        if let Some(message) = error {
            self.errors.insert(step, message);
        }

        self.data.extend(data);
        Ok(())
    }

    /// Record a failure the executor detected on a step's behalf
    pub(crate) fn record_failure(&mut self, step: &str, message: impl Into<String>) {
        if self.status(step) == StepStatus::Pending {
            self.steps.insert(step.to_string(), StepStatus::Failed);
        }
        self.errors.insert(step.to_string(), message.into());
    }

    /// Drop everything recorded for a step name
    pub(crate) fn forget_step(&mut self, step: &str) {
        self.steps.remove(step);
        self.errors.remove(step);
        self.output_files.remove(step);
    }

    /// Convert state to a JSON object
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Partial output of one step.
///
/// An update is scoped to a single step name, so it can only set that
/// step's status and that step's output file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    step: String,
    status: Option<StepStatus>,
    output_file: Option<String>,
    data: BTreeMap<String, Value>,
    error: Option<String>,
}

impl StateUpdate {
    /// An update that leaves the state as it is
    pub fn unchanged(step: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            ..Default::default()
        }
    }

    pub fn completed(step: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            status: Some(StepStatus::Completed),
            ..Default::default()
        }
    }

    pub fn failed(step: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            status: Some(StepStatus::Failed),
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn with_output_file(mut self, path: impl Into<String>) -> Self {
        self.output_file = Some(path.into());
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn step(&self) -> &str {
        &self.step
    }

    pub fn status(&self) -> Option<StepStatus> {
        self.status
    }

    pub fn output_file(&self) -> Option<&str> {
        self.output_file.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.output_file.is_none()
            && self.data.is_empty()
            && self.error.is_none()
    }
}
