use std::fmt;

use serde::{Deserialize, Serialize};

/// Status of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
  Pending,
  Running,
  StepComplete,
  WorkflowComplete,
  WorkflowFailed,
}

impl ExecutionStatus {
  pub fn is_terminal(self) -> bool {
    matches!(
      self,
      ExecutionStatus::WorkflowComplete | ExecutionStatus::WorkflowFailed
    )
  }

  pub fn can_transition_to(self, next: ExecutionStatus) -> bool {
    use ExecutionStatus::*;

    if self.is_terminal() {
      return false;
    }
    matches!(
      (self, next),
      (_, WorkflowFailed)
        | (_, WorkflowComplete)
        | (Pending, Running)
        | (StepComplete, Running)
        | (Running, StepComplete)
    )
  }

  pub fn as_str(self) -> &'static str {
    match self {
      ExecutionStatus::Pending => "PENDING",
      ExecutionStatus::Running => "RUNNING",
      ExecutionStatus::StepComplete => "STEP_COMPLETE",
      ExecutionStatus::WorkflowComplete => "WORKFLOW_COMPLETE",
      ExecutionStatus::WorkflowFailed => "WORKFLOW_FAILED",
    }
  }
}

impl fmt::Display for ExecutionStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
