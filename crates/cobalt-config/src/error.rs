use std::path::PathBuf;

/// Errors raised while loading or validating workflow documents.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("failed to read {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse {format} document: {message}")]
  Parse { format: String, message: String },

  #[error("duplicate workflow id: {workflow_id}")]
  DuplicateWorkflow { workflow_id: String },

  #[error("duplicate step id '{step_id}' in workflow '{workflow_id}'")]
  DuplicateStep { workflow_id: String, step_id: String },

  #[error("invalid operation reference on step '{step_id}': {message}")]
  InvalidOperation { step_id: String, message: String },
}
