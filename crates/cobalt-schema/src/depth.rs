use serde_json::Value;

/// Truncate a schema tree below `depth` levels.
///
/// A non-empty object at the cut is replaced by its declared `type` (or
/// `"object"`), a non-empty array by `"array"`. Scalars and empty
/// containers are kept as they are at any depth.
pub fn limit_depth(value: &Value, depth: usize) -> Value {
  match value {
    Value::Object(map) if !map.is_empty() => {
      if depth == 0 {
        let declared = map.get("type").and_then(Value::as_str).unwrap_or("object");
        return Value::String(declared.to_string());
      }
      Value::Object(
        map
          .iter()
          .map(|(key, child)| (key.clone(), limit_depth(child, depth - 1)))
          .collect(),
      )
    }
    Value::Array(items) if !items.is_empty() => {
      if depth == 0 {
        return Value::String("array".to_string());
      }
      Value::Array(items.iter().map(|child| limit_depth(child, depth - 1)).collect())
    }
    other => other.clone(),
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn test_truncates_to_declared_type() {
    let inputs = json!({
      "type": "object",
      "properties": {
        "bar": {"type": "string"},
        "deep": {"type": "object", "properties": {"x": {"type": "integer"}}},
        "untyped": {"properties": {"y": {}}},
        "empty": {}
      },
      "required": ["bar"]
    });

    assert_eq!(
      limit_depth(&inputs, 2),
      json!({
        "type": "object",
        "properties": {
          "bar": "string",
          "deep": "object",
          "untyped": "object",
          "empty": {}
        },
        "required": ["bar"]
      })
    );
  }

  #[test]
  fn test_depth_one_collapses_properties() {
    let outputs = json!({"type": "object", "properties": {"id": {"type": "integer"}}});
    assert_eq!(
      limit_depth(&outputs, 1),
      json!({"type": "object", "properties": "object"})
    );
  }

  #[test]
  fn test_arrays_and_scalars() {
    assert_eq!(limit_depth(&json!([1, 2]), 0), json!("array"));
    assert_eq!(limit_depth(&json!([]), 0), json!([]));
    assert_eq!(limit_depth(&json!("x"), 0), json!("x"));
    assert_eq!(limit_depth(&json!({}), 0), json!({}));
  }
}
