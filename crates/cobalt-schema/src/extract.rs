use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use crate::depth::limit_depth;
use crate::document::ApiDocument;
use crate::media::MediaTypePreference;
use crate::resolve::SchemaResolver;

/// Options for [`extract_operation_io`].
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
  pub input_max_depth: Option<usize>,
  pub output_max_depth: Option<usize>,
  pub media_types: MediaTypePreference,
}

/// Flattened input and output shape of one operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationIo {
  /// `{"type": "object", "properties": {...}, "required": [...]}`
  pub inputs: Value,
  /// Resolved schema of the first 2xx response, or `{}`.
  pub outputs: Value,
  /// The operation's `security` array, as declared.
  pub security_requirements: Value,
  /// Declared location of each parameter input, keyed by name.
  #[serde(skip)]
  pub parameter_locations: BTreeMap<String, String>,
}

impl OperationIo {
  /// Names of the inputs the operation requires.
  pub fn required_inputs(&self) -> impl Iterator<Item = &str> {
    self
      .inputs
      .get("required")
      .and_then(Value::as_array)
      .into_iter()
      .flatten()
      .filter_map(Value::as_str)
  }

  /// Declared location (`path`, `query`, ...) of a parameter input.
  pub fn parameter_location(&self, name: &str) -> Option<&str> {
    self.parameter_locations.get(name).map(String::as_str)
  }
}

/// Extract the input and output shape of `method path`.
///
/// Inputs gather every declared parameter, every URL template variable with
/// no matching `path` parameter, and the properties of the preferred request
/// body media type. Returns `None` when the document has no such operation.
pub fn extract_operation_io(
  document: &ApiDocument,
  path: &str,
  method: &str,
  options: &ExtractOptions,
) -> Option<OperationIo> {
  let Some(operation) = document.operation(path, method) else {
    warn!(path, method, "operation not found in document");
    return None;
  };
  let mut resolver = SchemaResolver::new(document);

  let mut properties = Map::new();
  let mut required = Vec::new();

  let mut locations = BTreeMap::new();
  let mut path_params = Vec::new();
  for parameter in collect_parameters(&resolver, document.path_item(path), operation) {
    let Some(name) = parameter.get("name").and_then(Value::as_str) else {
      continue;
    };
    let location = parameter.get("in").and_then(Value::as_str).unwrap_or("query");

    let schema = parameter
      .get("schema")
      .map(|schema| resolver.resolve(schema))
      .unwrap_or_else(|| json!({}));
    let mut entry = Map::new();
    entry.insert(
      "type".to_string(),
      schema.get("type").cloned().unwrap_or_else(|| json!("string")),
    );
    if let Some(description) = parameter.get("description") {
      entry.insert("description".to_string(), description.clone());
    }
    entry.insert("schema".to_string(), schema);
    properties.insert(name.to_string(), Value::Object(entry));
    locations.insert(name.to_string(), location.to_string());

    let declared_required = parameter.get("required").and_then(Value::as_bool) == Some(true);
    if location == "path" {
      path_params.push(name.to_string());
    }
    if location == "path" || declared_required {
      push_unique(&mut required, name);
    }
  }

  for variable in template_variables(path) {
    if path_params.iter().any(|p| p == variable) {
      continue;
    }
    debug!(path, variable, "synthesizing undeclared path parameter");
    properties.insert(
      variable.to_string(),
      json!({"type": "string", "schema": {"type": "string"}}),
    );
    locations.insert(variable.to_string(), "path".to_string());
    push_unique(&mut required, variable);
  }

  if let Some(body) = operation
    .get("requestBody")
    .and_then(|body| resolver.dereference(body))
  {
    flatten_request_body(
      &mut resolver,
      body,
      &options.media_types,
      &mut properties,
      &mut required,
    );
  }

  let mut inputs = json!({
    "type": "object",
    "properties": properties,
    "required": required,
  });
  let mut outputs = success_response_schema(&mut resolver, operation, &options.media_types)
    .unwrap_or_else(|| json!({}));

  if let Some(depth) = options.input_max_depth {
    inputs = limit_depth(&inputs, depth);
  }
  if let Some(depth) = options.output_max_depth {
    outputs = limit_depth(&outputs, depth);
  }

  Some(OperationIo {
    inputs,
    outputs,
    security_requirements: operation
      .get("security")
      .cloned()
      .unwrap_or_else(|| json!([])),
    parameter_locations: locations,
  })
}

/// Path-item parameters overridden by operation parameters with the same
/// `name` and `in`.
fn collect_parameters<'a>(
  resolver: &SchemaResolver<'a>,
  path_item: Option<&'a Value>,
  operation: &'a Value,
) -> Vec<&'a Value> {
  let declared = |owner: Option<&'a Value>| -> Vec<&'a Value> {
    owner
      .and_then(|o| o.get("parameters"))
      .and_then(Value::as_array)
      .into_iter()
      .flatten()
      .filter_map(|p| resolver.dereference(p))
      .collect()
  };

  let operation_params = declared(Some(operation));
  let mut parameters: Vec<&Value> = declared(path_item)
    .into_iter()
    .filter(|shared| {
      !operation_params
        .iter()
        .any(|own| own.get("name") == shared.get("name") && own.get("in") == shared.get("in"))
    })
    .collect();
  parameters.extend(operation_params);
  parameters
}

fn flatten_request_body(
  resolver: &mut SchemaResolver<'_>,
  body: &Value,
  media_types: &MediaTypePreference,
  properties: &mut Map<String, Value>,
  required: &mut Vec<String>,
) {
  let Some(content) = body.get("content") else {
    return;
  };
  let Some((media_type, media)) = media_types.select(content) else {
    warn!("request body has no supported media type");
    return;
  };

  let schema = media
    .get("schema")
    .map(|schema| resolver.resolve(schema))
    .unwrap_or_else(|| json!({}));
  debug!(media_type, "flattening request body");

  match schema.get("properties").and_then(Value::as_object) {
    Some(body_properties) => {
      for (name, property) in body_properties {
        properties.insert(name.clone(), property.clone());
      }
      for name in schema
        .get("required")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
      {
        push_unique(required, name);
      }
    }
    None if accepts_anything(&schema) || rejects_everything(&schema) => {}
    None => {
      properties.insert("body".to_string(), schema);
      if body.get("required").and_then(Value::as_bool) == Some(true) {
        push_unique(required, "body");
      }
    }
  }
}

fn success_response_schema<'a>(
  resolver: &mut SchemaResolver<'a>,
  operation: &'a Value,
  media_types: &MediaTypePreference,
) -> Option<Value> {
  let responses = operation.get("responses")?.as_object()?;
  let (status, response) = responses.iter().find(|(status, _)| is_success_status(status))?;
  let response = resolver.dereference(response)?;
  let Some((_, media)) = media_types.select(response.get("content")?) else {
    warn!(status = %status, "response has no supported media type");
    return None;
  };
  media.get("schema").map(|schema| resolver.resolve(schema))
}

fn is_success_status(status: &str) -> bool {
  status.len() == 3 && status.starts_with('2')
}

/// Names inside `{...}` segments of a URL template.
fn template_variables(path: &str) -> Vec<&str> {
  let mut variables = Vec::new();
  let mut rest = path;
  while let Some(start) = rest.find('{') {
    let after = &rest[start + 1..];
    let Some(end) = after.find('}') else {
      break;
    };
    let name = &after[..end];
    if !name.is_empty() {
      variables.push(name);
    }
    rest = &after[end + 1..];
  }
  variables
}

fn push_unique(list: &mut Vec<String>, name: &str) {
  if !list.iter().any(|existing| existing == name) {
    list.push(name.to_string());
  }
}

fn accepts_anything(schema: &Value) -> bool {
  schema.as_object().is_some_and(Map::is_empty)
}

fn rejects_everything(schema: &Value) -> bool {
  *schema == json!({"not": {}})
}

#[cfg(test)]
mod tests {
  use super::*;

  fn document() -> ApiDocument {
    ApiDocument::new(json!({
      "openapi": "3.1.0",
      "paths": {
        "/widgets/{widget_id}": {
          "get": {
            "responses": {"200": {"description": "ok"}}
          }
        },
        "/gadgets/{gadget_id}": {
          "parameters": [
            {"name": "X-Request-ID", "in": "header", "description": "Correlation id", "schema": {"type": "string", "format": "uuid"}}
          ],
          "put": {
            "parameters": [
              {"name": "gadget_id", "in": "path", "required": false, "schema": {"type": "integer"}},
              {"$ref": "#/components/parameters/Verbose"}
            ],
            "requestBody": {"$ref": "#/components/requestBodies/Gadget"},
            "responses": {
              "201": {"$ref": "#/components/responses/Gadget"},
              "400": {"description": "bad"}
            },
            "security": [{"oauth": ["write"]}, {"apiKey": []}]
          }
        },
        "/empty": {"post": {"responses": {}}},
        "/accept-any": {
          "post": {
            "requestBody": {"content": {"application/json": {"schema": true}}},
            "responses": {"200": {"content": {"application/json": {"schema": {"allOf": [{"type": "object"}, false]}}}}}
          }
        },
        "/login": {
          "post": {
            "requestBody": {
              "content": {
                "application/x-www-form-urlencoded": {
                  "schema": {"type": "object", "properties": {"username": {"type": "string"}, "password": {"type": "string"}}, "required": ["username", "password"]}
                }
              }
            },
            "responses": {"200": {"content": {"text/plain": {"schema": {"type": "string"}}}}}
          }
        },
        "/batch": {
          "post": {
            "requestBody": {
              "required": true,
              "content": {"application/json": {"schema": {"type": "array", "items": {"type": "string"}}}}
            },
            "responses": {"200": {"description": "ok"}}
          }
        },
        "/deep": {
          "post": {
            "requestBody": {
              "content": {"application/json": {"schema": {
                "type": "object",
                "properties": {"bar": {"type": "string"}, "deep": {"type": "object", "properties": {"x": {"type": "integer"}}}},
                "required": ["bar"]
              }}}
            },
            "responses": {"200": {"content": {"application/json": {"schema": {"type": "object", "properties": {"id": {"type": "integer"}}}}}}}
          }
        }
      },
      "components": {
        "parameters": {
          "Verbose": {"name": "verbose", "in": "query", "required": true, "schema": {"type": "boolean"}}
        },
        "requestBodies": {
          "Gadget": {
            "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Gadget"}}}
          }
        },
        "responses": {
          "Gadget": {
            "description": "created",
            "content": {"application/json; charset=utf-8": {"schema": {"$ref": "#/components/schemas/Gadget"}}}
          }
        },
        "schemas": {
          "Gadget": {
            "type": "object",
            "properties": {"name": {"type": "string"}, "size": {"type": "integer"}},
            "required": ["name"]
          }
        }
      }
    }))
  }

  fn extract(path: &str, method: &str) -> OperationIo {
    extract_operation_io(&document(), path, method, &ExtractOptions::default()).unwrap()
  }

  #[test]
  fn test_implicit_path_parameter() {
    let io = extract("/widgets/{widget_id}", "get");
    assert_eq!(
      io.inputs["properties"]["widget_id"],
      json!({"type": "string", "schema": {"type": "string"}})
    );
    assert_eq!(io.inputs["required"], json!(["widget_id"]));
    assert_eq!(io.parameter_location("widget_id"), Some("path"));
    assert_eq!(io.outputs, json!({}));
    assert_eq!(io.security_requirements, json!([]));
  }

  #[test]
  fn test_parameters_body_and_response() {
    let io = extract("/gadgets/{gadget_id}", "put");
    let properties = io.inputs["properties"].as_object().unwrap();

    assert_eq!(
      properties["X-Request-ID"],
      json!({
        "type": "string",
        "description": "Correlation id",
        "schema": {"type": "string", "format": "uuid"}
      })
    );
    assert_eq!(properties["gadget_id"]["type"], json!("integer"));
    assert_eq!(properties["name"], json!({"type": "string"}));
    assert_eq!(properties["size"], json!({"type": "integer"}));
    assert_eq!(io.parameter_location("verbose"), Some("query"));
    assert_eq!(io.parameter_location("X-Request-ID"), Some("header"));

    let required: Vec<&str> = io.required_inputs().collect();
    assert_eq!(required, vec!["gadget_id", "verbose", "name"]);

    assert_eq!(io.outputs["properties"]["size"], json!({"type": "integer"}));
    assert_eq!(
      io.security_requirements,
      json!([{"oauth": ["write"]}, {"apiKey": []}])
    );
  }

  #[test]
  fn test_no_parameters_no_body() {
    let io = extract("/empty", "post");
    assert_eq!(
      io.inputs,
      json!({"type": "object", "properties": {}, "required": []})
    );
  }

  #[test]
  fn test_boolean_body_and_response_schemas() {
    let io = extract("/accept-any", "post");
    assert_eq!(io.inputs["properties"], json!({}));
    assert_eq!(io.outputs, json!({"not": {}}));
  }

  #[test]
  fn test_form_body_and_unsupported_response() {
    let io = extract("/login", "post");
    assert_eq!(io.inputs["required"], json!(["username", "password"]));
    assert_eq!(io.outputs, json!({}));
  }

  #[test]
  fn test_non_object_body_is_single_input() {
    let io = extract("/batch", "post");
    assert_eq!(
      io.inputs["properties"]["body"],
      json!({"type": "array", "items": {"type": "string"}})
    );
    assert_eq!(io.inputs["required"], json!(["body"]));
  }

  #[test]
  fn test_depth_limits() {
    let options = ExtractOptions {
      input_max_depth: Some(2),
      output_max_depth: Some(1),
      ..ExtractOptions::default()
    };
    let io = extract_operation_io(&document(), "/deep", "post", &options).unwrap();
    assert_eq!(io.inputs["properties"]["bar"], json!("string"));
    assert_eq!(io.inputs["properties"]["deep"], json!("object"));
    assert_eq!(io.inputs["required"], json!(["bar"]));
    assert_eq!(io.outputs, json!({"type": "object", "properties": "object"}));
  }

  #[test]
  fn test_missing_operation() {
    assert!(extract_operation_io(&document(), "/nope", "get", &ExtractOptions::default()).is_none());
  }

  #[test]
  fn test_template_variables() {
    assert_eq!(template_variables("/a/{x}/b/{y}"), vec!["x", "y"]);
    assert!(template_variables("/plain").is_empty());
    assert!(template_variables("/broken/{x").is_empty());
  }
}
