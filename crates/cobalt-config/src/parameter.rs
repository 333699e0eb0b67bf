use serde::{Deserialize, Serialize};

/// Where a parameter is placed in the outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
  Path,
  Query,
  Header,
  Cookie,
}

impl ParameterLocation {
  pub fn as_str(&self) -> &'static str {
    match self {
      ParameterLocation::Path => "path",
      ParameterLocation::Query => "query",
      ParameterLocation::Header => "header",
      ParameterLocation::Cookie => "cookie",
    }
  }

  pub fn parse(value: &str) -> Option<Self> {
    match value {
      "path" => Some(ParameterLocation::Path),
      "query" => Some(ParameterLocation::Query),
      "header" => Some(ParameterLocation::Header),
      "cookie" => Some(ParameterLocation::Cookie),
      _ => None,
    }
  }
}

/// A parameter binding on a step.
///
/// `value` is either a literal or a runtime expression string. When `in` is
/// omitted the engine takes the location from the operation's declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
  pub name: String,
  #[serde(rename = "in", default, skip_serializing_if = "Option::is_none")]
  pub location: Option<ParameterLocation>,
  pub value: serde_json::Value,
  /// Regex transforms applied in order to the evaluated value.
  #[serde(rename = "x-transform", default, skip_serializing_if = "Vec::is_empty")]
  pub transforms: Vec<RegexTransform>,
}

/// One stage of a regex post-processing pipeline.
///
/// `result` may reference named groups as `\<name>` and numbered groups as
/// `\N`. A doubled backslash keeps the reference literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegexTransform {
  pub pattern: String,
  pub result: String,
  #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
  pub transform_type: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
}

impl RegexTransform {
  pub fn new(pattern: impl Into<String>, result: impl Into<String>) -> Self {
    Self {
      pattern: pattern.into(),
      result: result.into(),
      transform_type: None,
      description: None,
    }
  }
}

/// Request body template for a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBody {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub content_type: Option<String>,
  #[serde(default)]
  pub payload: serde_json::Value,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub replacements: Vec<PayloadReplacement>,
}

/// Replaces the value at `target` (a JSON pointer) after payload evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadReplacement {
  pub target: String,
  pub value: serde_json::Value,
}
