use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A fully materialized request for one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpRequest {
  pub method: String,
  pub url: String,
  /// Query parameters, in binding order.
  #[serde(default)]
  pub params: Vec<(String, String)>,
  #[serde(default)]
  pub headers: BTreeMap<String, String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub body: Option<RequestBody>,
}

impl HttpRequest {
  pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
    Self {
      method: method.into().to_uppercase(),
      url: url.into(),
      params: Vec::new(),
      headers: BTreeMap::new(),
      body: None,
    }
  }

  /// Case-insensitive header lookup.
  pub fn header(&self, name: &str) -> Option<&str> {
    self
      .headers
      .iter()
      .find(|(key, _)| key.eq_ignore_ascii_case(name))
      .map(|(_, value)| value.as_str())
  }

  pub fn has_header(&self, name: &str) -> bool {
    self.header(name).is_some()
  }

  pub fn param(&self, name: &str) -> Option<&str> {
    self
      .params
      .iter()
      .find(|(key, _)| key == name)
      .map(|(_, value)| value.as_str())
  }
}

/// Encoded request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum RequestBody {
  Json(Value),
  Form(Vec<(String, String)>),
  Text(String),
}

/// A received response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpResponse {
  pub status_code: u16,
  /// Header names are stored lowercased.
  #[serde(default)]
  pub headers: BTreeMap<String, String>,
  #[serde(default)]
  pub text: String,
}

impl HttpResponse {
  pub fn new(status_code: u16, text: impl Into<String>) -> Self {
    Self {
      status_code,
      headers: BTreeMap::new(),
      text: text.into(),
    }
  }

  /// Response with a JSON body and matching content type.
  pub fn json_body(status_code: u16, body: &Value) -> Self {
    Self::new(status_code, body.to_string()).with_header("content-type", "application/json")
  }

  pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
    self.headers.insert(name.to_lowercase(), value.into());
    self
  }

  pub fn header(&self, name: &str) -> Option<&str> {
    self.headers.get(&name.to_lowercase()).map(String::as_str)
  }

  pub fn json(&self) -> Result<Value, serde_json::Error> {
    serde_json::from_str(&self.text)
  }

  /// Body as JSON when it parses, otherwise as a string.
  pub fn body_value(&self) -> Value {
    self
      .json()
      .unwrap_or_else(|_| Value::String(self.text.clone()))
  }

  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status_code)
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn test_request_header_lookup_ignores_case() {
    let mut request = HttpRequest::new("get", "https://api.example.com/data");
    request
      .headers
      .insert("Authorization".to_string(), "Bearer abc".to_string());
    assert_eq!(request.method, "GET");
    assert_eq!(request.header("authorization"), Some("Bearer abc"));
    assert!(!request.has_header("cookie"));
  }

  #[test]
  fn test_response_body_value() {
    let response = HttpResponse::json_body(200, &json!({"token": "t"}));
    assert_eq!(response.body_value(), json!({"token": "t"}));
    assert_eq!(response.header("Content-Type"), Some("application/json"));
    assert!(response.is_success());

    let text = HttpResponse::new(502, "bad gateway");
    assert_eq!(text.body_value(), json!("bad gateway"));
    assert!(text.json().is_err());
    assert!(!text.is_success());
  }
}
