use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::criterion::Criterion;
use crate::error::ConfigError;
use crate::parameter::{Parameter, RequestBody};

const SOURCE_PREFIX: &str = "$sourceDescriptions.";

/// A single HTTP operation call within a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
  pub step_id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub operation_id: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub operation_path: Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub parameters: Vec<Parameter>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub request_body: Option<RequestBody>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub success_criteria: Vec<Criterion>,
  /// Output name to expression, evaluated against the step's response.
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub outputs: BTreeMap<String, String>,
}

/// The operation a step targets, with the source name when it is qualified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationRef {
  Id {
    source: Option<String>,
    operation_id: String,
  },
  Path {
    source: Option<String>,
    path: String,
    method: String,
  },
}

impl OperationRef {
  pub fn source(&self) -> Option<&str> {
    match self {
      OperationRef::Id { source, .. } | OperationRef::Path { source, .. } => source.as_deref(),
    }
  }
}

impl std::fmt::Display for OperationRef {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      OperationRef::Id { operation_id, .. } => write!(f, "{}", operation_id),
      OperationRef::Path { path, method, .. } => write!(f, "{} {}", method.to_uppercase(), path),
    }
  }
}

impl Step {
  /// Parse the step's operation reference.
  ///
  /// Accepts `operationId` (optionally `$sourceDescriptions.<name>.<id>`) or
  /// `operationPath` in the form `{$sourceDescriptions.<name>.url}#/paths/<path>/<method>`.
  pub fn operation(&self) -> Result<OperationRef, ConfigError> {
    match (&self.operation_id, &self.operation_path) {
      (Some(id), None) => Ok(parse_operation_id(id)),
      (None, Some(path)) => parse_operation_path(path).ok_or_else(|| ConfigError::InvalidOperation {
        step_id: self.step_id.clone(),
        message: format!("malformed operationPath '{}'", path),
      }),
      (Some(_), Some(_)) => Err(ConfigError::InvalidOperation {
        step_id: self.step_id.clone(),
        message: "operationId and operationPath are mutually exclusive".to_string(),
      }),
      (None, None) => Err(ConfigError::InvalidOperation {
        step_id: self.step_id.clone(),
        message: "missing operationId or operationPath".to_string(),
      }),
    }
  }
}

fn parse_operation_id(id: &str) -> OperationRef {
  if let Some(rest) = id.strip_prefix(SOURCE_PREFIX)
    && let Some((source, operation_id)) = rest.split_once('.')
  {
    return OperationRef::Id {
      source: Some(source.to_string()),
      operation_id: operation_id.to_string(),
    };
  }
  OperationRef::Id {
    source: None,
    operation_id: id.to_string(),
  }
}

fn parse_operation_path(value: &str) -> Option<OperationRef> {
  let (prefix, pointer) = value.split_once('#')?;
  let source = prefix
    .trim()
    .strip_prefix('{')
    .and_then(|s| s.strip_suffix('}'))
    .and_then(|s| s.strip_prefix(SOURCE_PREFIX))
    .and_then(|s| s.strip_suffix(".url"))
    .map(str::to_string);

  let mut tokens = pointer.strip_prefix('/')?.split('/');
  if tokens.next()? != "paths" {
    return None;
  }
  let path = unescape_pointer_token(tokens.next()?);
  let method = tokens.next()?.to_lowercase();
  if tokens.next().is_some() || !path.starts_with('/') {
    return None;
  }

  Some(OperationRef::Path {
    source,
    path,
    method,
  })
}

fn unescape_pointer_token(token: &str) -> String {
  token.replace("~1", "/").replace("~0", "~")
}
