//! Building the HTTP request for a step.

use cobalt_auth::{AuthLocation, RequestAuthValue};
use cobalt_config::{Parameter, ParameterLocation, RequestBody as BodyTemplate, Step};
use cobalt_expr::{ExpressionEvaluator, apply_regex_transforms, to_text};
use cobalt_http::{HttpRequest, RequestBody};
use cobalt_state::FailureReason;
use serde_json::Value;
use tracing::{debug, warn};

use crate::operation::ResolvedOperation;

const COOKIE: &str = "Cookie";
const CONTENT_TYPE: &str = "Content-Type";

/// Materialize a step's request from its bindings and the current state.
pub fn build_request(
  evaluator: &ExpressionEvaluator<'_>,
  step: &Step,
  operation: &ResolvedOperation<'_>,
  default_content_type: &str,
) -> Result<HttpRequest, FailureReason> {
  let base_url = operation
    .document
    .base_url()
    .ok_or_else(|| FailureReason::InvalidRequest {
      message: format!("source '{}' declares no servers", operation.source),
    })?;

  let mut request = HttpRequest::new(&operation.method, "");
  let mut path = operation.path.clone();

  for parameter in &step.parameters {
    let Some(value) = parameter_value(evaluator, parameter) else {
      debug!(parameter = %parameter.name, "parameter value absent, not sent");
      continue;
    };
    let text = to_text(&value);

    match parameter_location(parameter, operation) {
      ParameterLocation::Path => {
        let segment = urlencoding::encode(&text);
        path = path.replace(&format!("{{{}}}", parameter.name), &segment);
      }
      ParameterLocation::Query => request.params.push((parameter.name.clone(), text)),
      ParameterLocation::Header => {
        request.headers.insert(parameter.name.clone(), text);
      }
      ParameterLocation::Cookie => append_cookie(&mut request, &parameter.name, &text),
    }
  }

  if path.contains('{') {
    warn!(step_id = %step.step_id, path = %path, "path template has unbound variables");
  }
  request.url = format!("{}{}", base_url, path);

  if let Some(template) = &step.request_body {
    let content_type = template
      .content_type
      .clone()
      .or_else(|| operation.request_media_type.clone())
      .unwrap_or_else(|| default_content_type.to_string());
    let payload = render_payload(evaluator, template);
    request.body = Some(encode_body(&content_type, payload));
    if !request.has_header(CONTENT_TYPE) {
      request.headers.insert(CONTENT_TYPE.to_string(), content_type);
    }
  }

  warn_unbound_inputs(step, operation);
  Ok(request)
}

/// Merge credential values into a request. Values the step bound
/// explicitly are kept.
pub fn apply_credentials(request: &mut HttpRequest, credentials: Vec<RequestAuthValue>) {
  for credential in credentials {
    match credential.location {
      AuthLocation::Header if request.has_header(&credential.name) => {
        debug!(header = %credential.name, "explicit header overrides credential");
      }
      AuthLocation::Header => {
        request.headers.insert(credential.name, credential.value);
      }
      AuthLocation::Query if request.param(&credential.name).is_some() => {
        debug!(param = %credential.name, "explicit query parameter overrides credential");
      }
      AuthLocation::Query => request.params.push((credential.name, credential.value)),
      AuthLocation::Cookie => append_cookie(request, &credential.name, &credential.value),
    }
  }
}

fn parameter_value(evaluator: &ExpressionEvaluator<'_>, parameter: &Parameter) -> Option<Value> {
  let value = match &parameter.value {
    Value::String(text) => evaluator.resolve_string(text)?,
    other => other.clone(),
  };
  Some(apply_regex_transforms(value, &parameter.transforms))
}

/// Declared location on the step, else on the operation, else query.
fn parameter_location(parameter: &Parameter, operation: &ResolvedOperation<'_>) -> ParameterLocation {
  parameter
    .location
    .or_else(|| {
      operation
        .io
        .parameter_location(&parameter.name)
        .and_then(ParameterLocation::parse)
    })
    .unwrap_or(ParameterLocation::Query)
}

fn render_payload(evaluator: &ExpressionEvaluator<'_>, template: &BodyTemplate) -> Value {
  let mut payload = evaluator.resolve_value(&template.payload);

  for replacement in &template.replacements {
    let value = evaluator.resolve_value(&replacement.value);
    match payload.pointer_mut(&replacement.target) {
      Some(slot) => *slot = value,
      None => warn!(pointer = %replacement.target, "replacement target not found in payload"),
    }
  }

  payload
}

fn encode_body(content_type: &str, payload: Value) -> RequestBody {
  let base = content_type.split(';').next().unwrap_or(content_type).trim().to_lowercase();

  if base == "application/json" || base.ends_with("+json") {
    return RequestBody::Json(payload);
  }
  if base == "application/x-www-form-urlencoded"
    && let Value::Object(fields) = &payload
  {
    return RequestBody::Form(
      fields
        .iter()
        .map(|(name, value)| (name.clone(), to_text(value)))
        .collect(),
    );
  }
  RequestBody::Text(to_text(&payload))
}

fn append_cookie(request: &mut HttpRequest, name: &str, value: &str) {
  let pair = format!("{}={}", name, value);
  let existing = request
    .headers
    .iter_mut()
    .find(|(key, _)| key.eq_ignore_ascii_case(COOKIE));

  match existing {
    Some((_, cookies)) => {
      cookies.push_str("; ");
      cookies.push_str(&pair);
    }
    None => {
      request.headers.insert(COOKIE.to_string(), pair);
    }
  }
}

fn warn_unbound_inputs(step: &Step, operation: &ResolvedOperation<'_>) {
  let body_fields = step
    .request_body
    .as_ref()
    .and_then(|body| body.payload.as_object());

  for required in operation.io.required_inputs() {
    let bound = step.parameters.iter().any(|p| p.name == required)
      || body_fields.is_some_and(|fields| fields.contains_key(required))
      || (required == "body" && step.request_body.is_some());
    if !bound {
      warn!(step_id = %step.step_id, input = required, "required operation input is not bound");
    }
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use cobalt_schema::{ApiDocument, MediaTypePreference};
  use cobalt_state::ExecutionState;
  use serde_json::json;

  use super::*;
  use crate::operation::resolve_operation;

  fn item_request(inputs: Value) -> HttpRequest {
    let mut documents = HashMap::new();
    documents.insert(
      "api".to_string(),
      ApiDocument::new(json!({
        "servers": [{"url": "https://api.example.com/v1"}],
        "paths": {
          "/items/{itemId}": {
            "get": {
              "operationId": "getItem",
              "parameters": [{"name": "q", "in": "query", "schema": {"type": "string"}}]
            }
          }
        }
      })),
    );
    let step: Step = serde_json::from_value(json!({
      "stepId": "getItem",
      "operationId": "getItem",
      "parameters": [
        {"name": "itemId", "value": "$inputs.id"},
        {"name": "q", "value": "$inputs.q"}
      ]
    }))
    .unwrap();

    let operation = resolve_operation(&documents, &step, &MediaTypePreference::default()).unwrap();
    let state = ExecutionState::new("e", "w", inputs.as_object().unwrap().clone());
    let evaluator = ExpressionEvaluator::new(&state, None);
    build_request(&evaluator, &step, &operation, "application/json").unwrap()
  }

  #[test]
  fn test_path_values_are_encoded_as_one_segment() {
    let request = item_request(json!({"id": "a/b", "q": "x"}));
    assert_eq!(request.url, "https://api.example.com/v1/items/a%2Fb");

    let request = item_request(json!({"id": "a b?admin=1#frag", "q": "x"}));
    assert_eq!(
      request.url,
      "https://api.example.com/v1/items/a%20b%3Fadmin%3D1%23frag"
    );
  }

  #[test]
  fn test_query_values_are_left_for_the_transport_to_encode() {
    let request = item_request(json!({"id": 7, "q": "x y&z=1"}));
    assert_eq!(request.url, "https://api.example.com/v1/items/7");
    assert_eq!(request.param("q"), Some("x y&z=1"));
  }

  #[test]
  fn test_encode_json_body() {
    let body = encode_body("application/json; charset=utf-8", json!({"a": 1}));
    assert_eq!(body, RequestBody::Json(json!({"a": 1})));
    let body = encode_body("application/merge-patch+json", json!({"a": 1}));
    assert_eq!(body, RequestBody::Json(json!({"a": 1})));
  }

  #[test]
  fn test_encode_form_body() {
    let body = encode_body(
      "application/x-www-form-urlencoded",
      json!({"username": "alice", "remember": true}),
    );
    assert_eq!(
      body,
      RequestBody::Form(vec![
        ("remember".to_string(), "true".to_string()),
        ("username".to_string(), "alice".to_string()),
      ])
    );
  }

  #[test]
  fn test_encode_text_body() {
    assert_eq!(
      encode_body("text/plain", json!("hello")),
      RequestBody::Text("hello".to_string())
    );
  }

  #[test]
  fn test_cookies_are_joined() {
    let mut request = HttpRequest::new("GET", "https://example.com");
    append_cookie(&mut request, "a", "1");
    append_cookie(&mut request, "b", "2");
    assert_eq!(request.header("cookie"), Some("a=1; b=2"));
  }

  #[test]
  fn test_explicit_values_win_over_credentials() {
    let mut request = HttpRequest::new("GET", "https://example.com");
    request
      .headers
      .insert("authorization".to_string(), "Bearer explicit".to_string());
    request.params.push(("api_key".to_string(), "explicit".to_string()));

    apply_credentials(
      &mut request,
      vec![
        RequestAuthValue::bearer("from-provider"),
        RequestAuthValue::query("api_key", "from-provider"),
        RequestAuthValue::header("X-Tenant", "t1"),
        RequestAuthValue::cookie("sid", "s1"),
      ],
    );

    assert_eq!(request.header("Authorization"), Some("Bearer explicit"));
    assert_eq!(request.params, vec![("api_key".to_string(), "explicit".to_string())]);
    assert_eq!(request.header("X-Tenant"), Some("t1"));
    assert_eq!(request.header("Cookie"), Some("sid=s1"));
  }
}
