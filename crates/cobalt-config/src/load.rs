//! JSON and YAML loading for workflow and API documents.

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::document::WorkflowDocument;
use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
  Json,
  Yaml,
}

impl DocumentFormat {
  /// Pick the format from a file extension, defaulting to JSON.
  pub fn from_path(path: &Path) -> Self {
    match path.extension().and_then(|e| e.to_str()) {
      Some("yaml") | Some("yml") => DocumentFormat::Yaml,
      _ => DocumentFormat::Json,
    }
  }

  fn name(&self) -> &'static str {
    match self {
      DocumentFormat::Json => "json",
      DocumentFormat::Yaml => "yaml",
    }
  }
}

/// Parse document text in the given format.
pub fn parse_value<T: DeserializeOwned>(content: &str, format: DocumentFormat) -> Result<T, ConfigError> {
  let result = match format {
    DocumentFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
    DocumentFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
  };
  result.map_err(|message| ConfigError::Parse {
    format: format.name().to_string(),
    message,
  })
}

/// Read and parse a document file, choosing the format by extension.
pub fn load_value<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
  let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
    path: path.to_path_buf(),
    source,
  })?;
  parse_value(&content, DocumentFormat::from_path(path))
}

/// Load and validate a workflow document.
pub fn load_workflow_document(path: &Path) -> Result<WorkflowDocument, ConfigError> {
  let document: WorkflowDocument = load_value(path)?;
  document.validate()?;
  Ok(document)
}
