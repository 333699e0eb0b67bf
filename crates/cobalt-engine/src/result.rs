use cobalt_state::{ExecutionStatus, StepFailure};
use serde::Serialize;
use serde_json::{Map, Value};

/// Outcome of one `execute_next_step` call.
///
/// `outputs` carries the step's outputs on `STEP_COMPLETE` and the workflow
/// outputs on `WORKFLOW_COMPLETE`. `error` is set only on `WORKFLOW_FAILED`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
  pub status: ExecutionStatus,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub step_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub outputs: Option<Map<String, Value>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<StepFailure>,
}

impl StepResult {
  pub fn step_complete(step_id: impl Into<String>, outputs: Map<String, Value>) -> Self {
    Self {
      status: ExecutionStatus::StepComplete,
      step_id: Some(step_id.into()),
      outputs: Some(outputs),
      error: None,
    }
  }

  /// `step_id` is the last step executed, absent for a workflow without steps.
  pub fn workflow_complete(step_id: Option<String>, outputs: Map<String, Value>) -> Self {
    Self {
      status: ExecutionStatus::WorkflowComplete,
      step_id,
      outputs: Some(outputs),
      error: None,
    }
  }

  pub fn workflow_failed(failure: StepFailure) -> Self {
    Self {
      status: ExecutionStatus::WorkflowFailed,
      step_id: Some(failure.step_id.clone()),
      outputs: None,
      error: Some(failure),
    }
  }

  pub fn is_terminal(&self) -> bool {
    self.status.is_terminal()
  }
}
