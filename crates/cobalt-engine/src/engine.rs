//! Step-sequencing workflow engine.
//!
//! Each `execute_next_step` call runs exactly one step of a run, in document
//! order, and reports where the run stands afterwards.

use std::collections::BTreeMap;
use std::sync::Arc;

use cobalt_auth::{CredentialProvider, FetchOptions};
use cobalt_config::{Step, Workflow, WorkflowDocument};
use cobalt_expr::ExpressionEvaluator;
use cobalt_http::Transport;
use cobalt_schema::{DocumentProvider, MediaTypePreference};
use cobalt_state::{ExecutionState, FailureReason, StepFailure};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::error::EngineError;
use crate::events::{ExecutionEvent, ExecutionNotifier, NoopNotifier};
use crate::operation::resolve_operation;
use crate::registry::RunRegistry;
use crate::request::{apply_credentials, build_request};
use crate::result::StepResult;

/// Configuration for the workflow engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
  /// Request/response media types in order of preference.
  pub media_types: MediaTypePreference,
  /// Content type for a request body when neither the step nor the
  /// operation names one.
  pub default_content_type: String,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      media_types: MediaTypePreference::default(),
      default_content_type: "application/json".to_string(),
    }
  }
}

/// External collaborators injected at construction.
#[derive(Clone)]
pub struct Collaborators {
  pub documents: Arc<dyn DocumentProvider>,
  pub transport: Arc<dyn Transport>,
  pub credentials: Arc<dyn CredentialProvider>,
}

/// The workflow engine.
///
/// Generic over `N: ExecutionNotifier` to allow different notification strategies.
/// Runs live in a registry owned by the engine, so two engines never see each
/// other's executions.
pub struct WorkflowEngine<N: ExecutionNotifier = NoopNotifier> {
  document: WorkflowDocument,
  collaborators: Collaborators,
  config: EngineConfig,
  runs: RunRegistry,
  notifier: N,
}

impl WorkflowEngine<NoopNotifier> {
  /// Create an engine with no-op notifications.
  pub fn new(
    document: WorkflowDocument,
    collaborators: Collaborators,
    config: EngineConfig,
  ) -> Result<Self, EngineError> {
    Self::with_notifier(document, collaborators, config, NoopNotifier)
  }
}

impl<N: ExecutionNotifier> WorkflowEngine<N> {
  /// Create an engine with a custom notifier. The document is validated once here.
  pub fn with_notifier(
    document: WorkflowDocument,
    collaborators: Collaborators,
    config: EngineConfig,
    notifier: N,
  ) -> Result<Self, EngineError> {
    document.validate()?;
    Ok(Self {
      document,
      collaborators,
      config,
      runs: RunRegistry::new(),
      notifier,
    })
  }

  pub fn document(&self) -> &WorkflowDocument {
    &self.document
  }

  /// Register a new run of `workflow_id` and return its execution id.
  ///
  /// Inputs are stored as given; they are not checked against the
  /// workflow's declared input schema.
  #[instrument(skip(self, inputs), fields(workflow_id = %workflow_id))]
  pub fn start_workflow(
    &self,
    workflow_id: &str,
    inputs: Map<String, Value>,
  ) -> Result<String, EngineError> {
    self.workflow(workflow_id)?;

    let execution_id = uuid::Uuid::new_v4().to_string();
    self
      .runs
      .insert(ExecutionState::new(execution_id.clone(), workflow_id, inputs));

    info!(execution_id = %execution_id, "workflow_started");
    self.notifier.notify(ExecutionEvent::WorkflowStarted {
      execution_id: execution_id.clone(),
      workflow_id: workflow_id.to_string(),
    });

    Ok(execution_id)
  }

  /// Execute the next step of a run.
  ///
  /// A failing step is not an error: the run moves to `WORKFLOW_FAILED` and
  /// the failure is returned in the result. Errors are reserved for unknown
  /// or finished runs and for a call racing another on the same run.
  #[instrument(skip(self), fields(execution_id = %execution_id))]
  pub async fn execute_next_step(&self, execution_id: &str) -> Result<StepResult, EngineError> {
    let handle = self
      .runs
      .get(execution_id)
      .ok_or_else(|| EngineError::ExecutionNotFound {
        execution_id: execution_id.to_string(),
      })?;
    let mut state = handle
      .try_lock()
      .map_err(|_| EngineError::StepInProgress {
        execution_id: execution_id.to_string(),
      })?;

    if state.is_terminal() {
      return Err(EngineError::ExecutionTerminal {
        execution_id: execution_id.to_string(),
        status: state.status(),
      });
    }

    let workflow = self.workflow(state.workflow_id())?;
    let Some(step) = workflow.steps.get(state.current_step_index()) else {
      return self.finish(&mut state, workflow, None);
    };

    let index = state.begin_step()?;
    info!(step_id = %step.step_id, index, "step_started");
    self.notifier.notify(ExecutionEvent::StepStarted {
      execution_id: execution_id.to_string(),
      step_id: step.step_id.clone(),
    });

    match self.run_step(&state, step).await {
      Ok(outputs) => {
        state.complete_step(&step.step_id, outputs.clone())?;
        info!(step_id = %step.step_id, "step_completed");
        self.notifier.notify(ExecutionEvent::StepCompleted {
          execution_id: execution_id.to_string(),
          step_id: step.step_id.clone(),
          outputs: Value::Object(outputs.clone()),
        });

        if state.current_step_index() >= workflow.steps.len() {
          return self.finish(&mut state, workflow, Some(step.step_id.clone()));
        }
        Ok(StepResult::step_complete(step.step_id.clone(), outputs))
      }
      Err(reason) => {
        let failure = StepFailure::new(step.step_id.clone(), reason);
        warn!(step_id = %step.step_id, error = %failure.reason, "step_failed");
        state.fail(failure.clone())?;

        self.notifier.notify(ExecutionEvent::StepFailed {
          execution_id: execution_id.to_string(),
          step_id: step.step_id.clone(),
          error: failure.reason.to_string(),
        });
        self.notifier.notify(ExecutionEvent::WorkflowFailed {
          execution_id: execution_id.to_string(),
          error: failure.to_string(),
        });
        Ok(StepResult::workflow_failed(failure))
      }
    }
  }

  /// Clone of a run's current state.
  pub async fn snapshot(&self, execution_id: &str) -> Option<ExecutionState> {
    let handle = self.runs.get(execution_id)?;
    let state = handle.lock().await;
    Some(state.clone())
  }

  pub fn execution_ids(&self) -> Vec<String> {
    self.runs.execution_ids()
  }

  fn workflow(&self, workflow_id: &str) -> Result<&Workflow, EngineError> {
    self
      .document
      .workflow(workflow_id)
      .ok_or_else(|| EngineError::WorkflowNotFound {
        workflow_id: workflow_id.to_string(),
      })
  }

  /// Run one step against the current state and return its outputs.
  async fn run_step(
    &self,
    state: &ExecutionState,
    step: &Step,
  ) -> Result<Map<String, Value>, FailureReason> {
    let documents: &dyn DocumentProvider = self.collaborators.documents.as_ref();
    let operation = resolve_operation(documents, step, &self.config.media_types)?;

    let mut request = {
      let evaluator = ExpressionEvaluator::new(state, None);
      build_request(&evaluator, step, &operation, &self.config.default_content_type)?
    };

    let options = FetchOptions {
      source_name: Some(operation.source.clone()),
    };
    let credentials = self
      .collaborators
      .credentials
      .get_credentials(&operation.security, &options)
      .await;
    apply_credentials(&mut request, credentials);

    debug!(method = %request.method, url = %request.url, "sending request");
    let response = match self.collaborators.transport.request(request).await {
      Ok(response) => response,
      Err(err) => {
        // Criteria that hold without a response let the step through.
        let evaluator = ExpressionEvaluator::new(state, None);
        if step.success_criteria.is_empty() || evaluator.first_unmet(&step.success_criteria).is_some() {
          return Err(FailureReason::Transport {
            message: err.to_string(),
          });
        }
        warn!(error = %err, "transport error tolerated by success criteria");
        return Ok(evaluate_outputs(&evaluator, &step.outputs));
      }
    };

    debug!(status_code = response.status_code, "received response");
    let evaluator = ExpressionEvaluator::new(state, Some(&response));
    if let Some(unmet) = evaluator.first_unmet(&step.success_criteria) {
      return Err(FailureReason::CriteriaUnmet {
        condition: unmet.condition.clone(),
        status_code: Some(response.status_code),
      });
    }

    Ok(evaluate_outputs(&evaluator, &step.outputs))
  }

  /// Evaluate workflow outputs and move the run to `WORKFLOW_COMPLETE`.
  fn finish(
    &self,
    state: &mut ExecutionState,
    workflow: &Workflow,
    last_step: Option<String>,
  ) -> Result<StepResult, EngineError> {
    let outputs = {
      let evaluator = ExpressionEvaluator::new(state, None);
      evaluate_outputs(&evaluator, &workflow.outputs)
    };
    state.complete_workflow(outputs.clone())?;

    info!(workflow_id = %workflow.workflow_id, "workflow_completed");
    self.notifier.notify(ExecutionEvent::WorkflowCompleted {
      execution_id: state.execution_id().to_string(),
      outputs: Value::Object(outputs.clone()),
    });
    Ok(StepResult::workflow_complete(last_step, outputs))
  }
}

fn evaluate_outputs(
  evaluator: &ExpressionEvaluator<'_>,
  expressions: &BTreeMap<String, String>,
) -> Map<String, Value> {
  let mut outputs = Map::new();
  for (name, expression) in expressions {
    match evaluator.resolve_string(expression) {
      Some(value) => {
        outputs.insert(name.clone(), value);
      }
      None => warn!(output = %name, expression = %expression, "output expression resolved to nothing"),
    }
  }
  outputs
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_engine_config_defaults() {
    let config: EngineConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config, EngineConfig::default());
    assert_eq!(config.default_content_type, "application/json");
    assert_eq!(
      config.media_types.media_types(),
      ["application/json", "application/x-www-form-urlencoded"]
    );
  }

  #[test]
  fn test_engine_config_overrides_media_types() {
    let config: EngineConfig =
      serde_json::from_str(r#"{"mediaTypes": ["application/xml"], "defaultContentType": "text/plain"}"#)
        .unwrap();
    assert_eq!(config.media_types.media_types(), ["application/xml"]);
    assert_eq!(config.default_content_type, "text/plain");
  }
}
