use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One entry of a `security` array: scheme name to required scopes.
///
/// All schemes in one requirement must be satisfied together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecurityRequirement(pub BTreeMap<String, Vec<String>>);

impl SecurityRequirement {
  pub fn new<I, S>(schemes: I) -> Self
  where
    I: IntoIterator<Item = (S, Vec<String>)>,
    S: Into<String>,
  {
    Self(schemes.into_iter().map(|(name, scopes)| (name.into(), scopes)).collect())
  }

  pub fn schemes(&self) -> impl Iterator<Item = &str> {
    self.0.keys().map(String::as_str)
  }

  pub fn scopes(&self, scheme: &str) -> Option<&[String]> {
    self.0.get(scheme).map(Vec::as_slice)
  }

  /// An empty requirement means "no authentication needed".
  pub fn is_anonymous(&self) -> bool {
    self.0.is_empty()
  }
}

/// Where a credential value is placed in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthLocation {
  Header,
  Query,
  Cookie,
}

/// A concrete credential ready to be attached to a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestAuthValue {
  pub location: AuthLocation,
  pub name: String,
  pub value: String,
}

impl RequestAuthValue {
  pub fn header(name: impl Into<String>, value: impl Into<String>) -> Self {
    Self {
      location: AuthLocation::Header,
      name: name.into(),
      value: value.into(),
    }
  }

  pub fn query(name: impl Into<String>, value: impl Into<String>) -> Self {
    Self {
      location: AuthLocation::Query,
      name: name.into(),
      value: value.into(),
    }
  }

  pub fn cookie(name: impl Into<String>, value: impl Into<String>) -> Self {
    Self {
      location: AuthLocation::Cookie,
      name: name.into(),
      value: value.into(),
    }
  }

  pub fn bearer(token: &str) -> Self {
    Self::header("Authorization", format!("Bearer {}", token))
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn test_requirement_from_security_array() {
    let requirements: Vec<SecurityRequirement> =
      serde_json::from_value(json!([{"oauth": ["read", "write"]}, {}])).unwrap();
    assert_eq!(requirements.len(), 2);
    assert_eq!(
      requirements[0].scopes("oauth"),
      Some(&["read".to_string(), "write".to_string()][..])
    );
    assert!(requirements[1].is_anonymous());
  }

  #[test]
  fn test_auth_value_serialization() {
    let value = RequestAuthValue::bearer("abc");
    assert_eq!(
      serde_json::to_value(&value).unwrap(),
      json!({"location": "header", "name": "Authorization", "value": "Bearer abc"})
    );
  }
}
