//! Engine errors.

use cobalt_config::ConfigError;
use cobalt_state::{ExecutionStatus, StateError};

/// Errors reported at the engine's call boundary.
///
/// A failing step is not an error: it ends the run and is returned inside
/// the step result.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
  /// The workflow id is not in the document.
  #[error("workflow '{workflow_id}' not found")]
  WorkflowNotFound { workflow_id: String },

  /// No run is registered under the execution id.
  #[error("execution '{execution_id}' not found")]
  ExecutionNotFound { execution_id: String },

  /// The run already finished. Start a new run to retry.
  #[error("execution '{execution_id}' is already {status}")]
  ExecutionTerminal {
    execution_id: String,
    status: ExecutionStatus,
  },

  /// Another call is executing a step of the same run.
  #[error("execution '{execution_id}' already has a step in progress")]
  StepInProgress { execution_id: String },

  #[error("invalid workflow document: {source}")]
  InvalidDocument {
    #[from]
    source: ConfigError,
  },

  #[error(transparent)]
  State(#[from] StateError),
}
