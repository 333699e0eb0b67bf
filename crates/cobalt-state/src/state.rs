use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StateError;
use crate::failure::StepFailure;
use crate::status::ExecutionStatus;

/// Record of one workflow run.
///
/// `step_outputs` holds an entry for a step iff that step completed
/// successfully. Inputs never change after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionState {
  execution_id: String,
  workflow_id: String,
  inputs: Map<String, Value>,
  step_outputs: BTreeMap<String, Map<String, Value>>,
  workflow_outputs: Option<Map<String, Value>>,
  status: ExecutionStatus,
  current_step_index: usize,
  failure: Option<StepFailure>,
}

impl ExecutionState {
  pub fn new(
    execution_id: impl Into<String>,
    workflow_id: impl Into<String>,
    inputs: Map<String, Value>,
  ) -> Self {
    Self {
      execution_id: execution_id.into(),
      workflow_id: workflow_id.into(),
      inputs,
      step_outputs: BTreeMap::new(),
      workflow_outputs: None,
      status: ExecutionStatus::Pending,
      current_step_index: 0,
      failure: None,
    }
  }

  pub fn execution_id(&self) -> &str {
    &self.execution_id
  }

  pub fn workflow_id(&self) -> &str {
    &self.workflow_id
  }

  pub fn inputs(&self) -> &Map<String, Value> {
    &self.inputs
  }

  pub fn status(&self) -> ExecutionStatus {
    self.status
  }

  pub fn current_step_index(&self) -> usize {
    self.current_step_index
  }

  pub fn step_outputs(&self) -> &BTreeMap<String, Map<String, Value>> {
    &self.step_outputs
  }

  pub fn outputs_of(&self, step_id: &str) -> Option<&Map<String, Value>> {
    self.step_outputs.get(step_id)
  }

  pub fn workflow_outputs(&self) -> Option<&Map<String, Value>> {
    self.workflow_outputs.as_ref()
  }

  pub fn failure(&self) -> Option<&StepFailure> {
    self.failure.as_ref()
  }

  pub fn is_terminal(&self) -> bool {
    self.status.is_terminal()
  }

  /// Mark the step at the current index as running.
  pub fn begin_step(&mut self) -> Result<usize, StateError> {
    self.transition(ExecutionStatus::Running)?;
    Ok(self.current_step_index)
  }

  /// Record a step's outputs and advance to the next step.
  pub fn complete_step(
    &mut self,
    step_id: &str,
    outputs: Map<String, Value>,
  ) -> Result<(), StateError> {
    if self.step_outputs.contains_key(step_id) {
      return Err(StateError::OutputsAlreadyRecorded {
        step_id: step_id.to_string(),
      });
    }
    self.transition(ExecutionStatus::StepComplete)?;
    self.step_outputs.insert(step_id.to_string(), outputs);
    self.current_step_index += 1;
    Ok(())
  }

  pub fn complete_workflow(&mut self, outputs: Map<String, Value>) -> Result<(), StateError> {
    self.transition(ExecutionStatus::WorkflowComplete)?;
    self.workflow_outputs = Some(outputs);
    Ok(())
  }

  pub fn fail(&mut self, failure: StepFailure) -> Result<(), StateError> {
    self.transition(ExecutionStatus::WorkflowFailed)?;
    self.failure = Some(failure);
    Ok(())
  }

  fn transition(&mut self, next: ExecutionStatus) -> Result<(), StateError> {
    if !self.status.can_transition_to(next) {
      return Err(StateError::InvalidTransition {
        from: self.status,
        to: next,
      });
    }
    self.status = next;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::failure::FailureReason;

  fn state() -> ExecutionState {
    let inputs = json!({"username": "alice"}).as_object().unwrap().clone();
    ExecutionState::new("exec-1", "login", inputs)
  }

  fn outputs(value: Value) -> Map<String, Value> {
    value.as_object().unwrap().clone()
  }

  #[test]
  fn test_new_state_is_pending() {
    let state = state();
    assert_eq!(state.status(), ExecutionStatus::Pending);
    assert_eq!(state.current_step_index(), 0);
    assert_eq!(state.inputs()["username"], json!("alice"));
    assert!(state.step_outputs().is_empty());
    assert!(state.workflow_outputs().is_none());
  }

  #[test]
  fn test_step_lifecycle() {
    let mut state = state();
    assert_eq!(state.begin_step().unwrap(), 0);
    state.complete_step("login", outputs(json!({"token": "t"}))).unwrap();
    assert_eq!(state.status(), ExecutionStatus::StepComplete);
    assert_eq!(state.current_step_index(), 1);
    assert_eq!(state.outputs_of("login").unwrap()["token"], json!("t"));

    assert_eq!(state.begin_step().unwrap(), 1);
    state.complete_step("fetch", Map::new()).unwrap();
    state
      .complete_workflow(outputs(json!({"result": 1})))
      .unwrap();
    assert_eq!(state.status(), ExecutionStatus::WorkflowComplete);
    assert_eq!(state.workflow_outputs().unwrap()["result"], json!(1));
  }

  #[test]
  fn test_outputs_are_write_once() {
    let mut state = state();
    state.begin_step().unwrap();
    state.complete_step("login", Map::new()).unwrap();
    state.begin_step().unwrap();
    let err = state
      .complete_step("login", outputs(json!({"token": "other"})))
      .unwrap_err();
    assert_eq!(
      err,
      StateError::OutputsAlreadyRecorded {
        step_id: "login".to_string()
      }
    );
    assert!(state.outputs_of("login").unwrap().is_empty());
  }

  #[test]
  fn test_failed_state_is_absorbing() {
    let mut state = state();
    state.begin_step().unwrap();
    state
      .fail(StepFailure::new(
        "login",
        FailureReason::CriteriaUnmet {
          condition: "$statusCode == 200".to_string(),
          status_code: Some(401),
        },
      ))
      .unwrap();

    assert!(state.is_terminal());
    assert!(matches!(
      state.begin_step(),
      Err(StateError::InvalidTransition { .. })
    ));
    assert!(state.complete_workflow(Map::new()).is_err());
    assert_eq!(state.failure().unwrap().step_id, "login");
  }
}
