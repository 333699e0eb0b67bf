use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::step::Step;

/// A workflow document: named API sources plus the workflows that call them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDocument {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub arazzo: Option<String>,
  #[serde(default)]
  pub info: Info,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub source_descriptions: Vec<SourceDescription>,
  pub workflows: Vec<Workflow>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Info {
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub version: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
}

/// A named API document the workflow's steps refer to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDescription {
  pub name: String,
  pub url: String,
  #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
  pub source_type: Option<String>,
}

/// An ordered sequence of steps with declared inputs and outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
  pub workflow_id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub summary: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  /// Declared input shape. Stored for introspection, never validated.
  #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
  pub inputs: serde_json::Value,
  pub steps: Vec<Step>,
  /// Workflow output name to expression, evaluated once all steps complete.
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub outputs: BTreeMap<String, String>,
}

impl WorkflowDocument {
  pub fn workflow(&self, workflow_id: &str) -> Option<&Workflow> {
    self.workflows.iter().find(|w| w.workflow_id == workflow_id)
  }

  pub fn source(&self, name: &str) -> Option<&SourceDescription> {
    self.source_descriptions.iter().find(|s| s.name == name)
  }

  /// Check the structural rules the engine relies on.
  pub fn validate(&self) -> Result<(), ConfigError> {
    let mut workflow_ids = HashSet::new();
    for workflow in &self.workflows {
      if !workflow_ids.insert(workflow.workflow_id.as_str()) {
        return Err(ConfigError::DuplicateWorkflow {
          workflow_id: workflow.workflow_id.clone(),
        });
      }

      let mut step_ids = HashSet::new();
      for step in &workflow.steps {
        if !step_ids.insert(step.step_id.as_str()) {
          return Err(ConfigError::DuplicateStep {
            workflow_id: workflow.workflow_id.clone(),
            step_id: step.step_id.clone(),
          });
        }
        step.operation()?;
      }
    }
    Ok(())
  }
}
