use serde::{Deserialize, Serialize};

/// Structured record of the step that ended a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("step '{step_id}' failed: {reason}")]
pub struct StepFailure {
  pub step_id: String,
  pub reason: FailureReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
  #[error("success criterion not met: {condition}")]
  CriteriaUnmet {
    condition: String,
    status_code: Option<u16>,
  },

  #[error("transport error: {message}")]
  Transport { message: String },

  #[error("operation '{operation}' not found")]
  OperationNotFound { operation: String },

  #[error("invalid request: {message}")]
  InvalidRequest { message: String },
}

impl StepFailure {
  pub fn new(step_id: impl Into<String>, reason: FailureReason) -> Self {
    Self {
      step_id: step_id.into(),
      reason,
    }
  }
}
