use serde_json::{Map, Value};

/// Merge `addition` into `base`.
///
/// Boolean schemas absorb: `true` on either side yields `true`, otherwise
/// `false` on either side yields `false`. A schema closed with
/// `additionalProperties: false` is never widened and is returned unchanged.
/// Otherwise `properties` are unioned (addition wins), `required` lists are
/// unioned without duplicates, and any other key from `addition` overrides
/// the same key in `base`.
pub fn merge_schemas(base: &Value, addition: &Value) -> Value {
  match (base, addition) {
    (Value::Bool(true), _) | (_, Value::Bool(true)) => Value::Bool(true),
    (Value::Bool(false), _) | (_, Value::Bool(false)) => Value::Bool(false),
    (Value::Object(base_map), Value::Object(addition_map)) => {
      if is_closed(base_map) {
        return base.clone();
      }
      if is_closed(addition_map) {
        return addition.clone();
      }
      Value::Object(merge_maps(base_map, addition_map))
    }
    _ => addition.clone(),
  }
}

fn is_closed(schema: &Map<String, Value>) -> bool {
  matches!(schema.get("additionalProperties"), Some(Value::Bool(false)))
}

fn merge_maps(base: &Map<String, Value>, addition: &Map<String, Value>) -> Map<String, Value> {
  let mut merged = base.clone();

  for (key, value) in addition {
    let combined = match (key.as_str(), merged.get_mut(key), value) {
      ("properties", Some(Value::Object(existing)), Value::Object(incoming)) => {
        for (name, schema) in incoming {
          existing.insert(name.clone(), schema.clone());
        }
        true
      }
      ("required", Some(Value::Array(existing)), Value::Array(incoming)) => {
        for name in incoming {
          if !existing.contains(name) {
            existing.push(name.clone());
          }
        }
        true
      }
      _ => false,
    };

    if !combined {
      merged.insert(key.clone(), value.clone());
    }
  }

  merged
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn test_boolean_absorption() {
    let string = json!({"type": "string"});
    let t = json!(true);
    let f = json!(false);

    assert_eq!(merge_schemas(&t, &string), t);
    assert_eq!(merge_schemas(&f, &string), f);
    assert_eq!(merge_schemas(&string, &t), t);
    assert_eq!(merge_schemas(&string, &f), f);
    assert_eq!(merge_schemas(&t, &t), t);
    assert_eq!(merge_schemas(&f, &f), f);
    assert_eq!(merge_schemas(&t, &f), t);
    assert_eq!(merge_schemas(&f, &t), t);
  }

  #[test]
  fn test_closed_base_is_not_widened() {
    let base = json!({
      "properties": {"name": {"type": "string"}},
      "additionalProperties": false
    });
    let addition = json!({"properties": {"email": {"type": "string"}}});
    assert_eq!(merge_schemas(&base, &addition), base);
  }

  #[test]
  fn test_closed_addition_is_kept() {
    let base = json!({"properties": {"name": {"type": "string"}}, "required": ["name"]});
    let addition = json!({
      "properties": {"price": {"type": "number"}},
      "additionalProperties": false
    });
    assert_eq!(merge_schemas(&base, &addition), addition);
  }

  #[test]
  fn test_structural_merge() {
    let base = json!({
      "type": "object",
      "description": "base",
      "properties": {"id": {"type": "integer"}, "name": {"type": "string"}},
      "required": ["id", "name"]
    });
    let addition = json!({
      "description": "extended",
      "properties": {"name": {"type": "string", "minLength": 1}, "email": {"type": "string"}},
      "required": ["name", "email"]
    });

    assert_eq!(
      merge_schemas(&base, &addition),
      json!({
        "type": "object",
        "description": "extended",
        "properties": {
          "id": {"type": "integer"},
          "name": {"type": "string", "minLength": 1},
          "email": {"type": "string"}
        },
        "required": ["id", "name", "email"]
      })
    );
  }

  #[test]
  fn test_required_only_when_present() {
    let merged = merge_schemas(&json!({"type": "object"}), &json!({"properties": {}}));
    assert!(merged.get("required").is_none());

    let merged = merge_schemas(&json!({"type": "object"}), &json!({"required": ["a"]}));
    assert_eq!(merged["required"], json!(["a"]));
  }
}
