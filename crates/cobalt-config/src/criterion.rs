use serde::{Deserialize, Serialize};

/// A single success condition on a step.
///
/// Simple criteria are written as `<expression> <operator> <literal>`, for
/// example `$statusCode == 200`. Regex criteria match `condition` as a
/// pattern against the string form of `context`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
  pub condition: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub context: Option<String>,
  #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
  pub criterion_type: Option<CriterionTypeDef>,
}

impl Criterion {
  pub fn simple(condition: impl Into<String>) -> Self {
    Self {
      condition: condition.into(),
      context: None,
      criterion_type: None,
    }
  }

  /// The effective criterion type, `simple` when none is declared.
  pub fn kind(&self) -> CriterionType {
    match &self.criterion_type {
      None => CriterionType::Simple,
      Some(CriterionTypeDef::Name(kind)) => *kind,
      Some(CriterionTypeDef::Expression { kind, .. }) => *kind,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CriterionType {
  Simple,
  Regex,
  Jsonpath,
  Xpath,
}

/// The `type` field accepts either a bare name or `{type, version}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CriterionTypeDef {
  Name(CriterionType),
  Expression {
    #[serde(rename = "type")]
    kind: CriterionType,
    version: String,
  },
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_kind_defaults_to_simple() {
    let criterion: Criterion = serde_json::from_str(r#"{"condition": "$statusCode == 200"}"#).unwrap();
    assert_eq!(criterion.kind(), CriterionType::Simple);
  }

  #[test]
  fn test_kind_from_expression_type() {
    let criterion: Criterion = serde_json::from_str(
      r#"{"condition": "$.items", "context": "$response.body", "type": {"type": "jsonpath", "version": "draft-goessner-dispatch-jsonpath-00"}}"#,
    )
    .unwrap();
    assert_eq!(criterion.kind(), CriterionType::Jsonpath);
  }

  #[test]
  fn test_kind_from_name() {
    let criterion: Criterion =
      serde_json::from_str(r#"{"condition": "^2", "context": "$statusCode", "type": "regex"}"#).unwrap();
    assert_eq!(criterion.kind(), CriterionType::Regex);
  }
}
