use std::collections::HashSet;

use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use crate::document::ApiDocument;
use crate::merge::merge_schemas;

/// Resolves schema fragments against one API document.
///
/// The resolver holds the set of `$ref` targets currently being expanded.
/// Revisiting one of them emits a `{"$ref": ...}` marker instead of
/// recursing, so cyclic schema graphs terminate. The set only lives for the
/// duration of a resolution and is empty between top-level calls.
pub struct SchemaResolver<'a> {
  document: &'a ApiDocument,
  in_progress: HashSet<String>,
}

impl<'a> SchemaResolver<'a> {
  pub fn new(document: &'a ApiDocument) -> Self {
    Self {
      document,
      in_progress: HashSet::new(),
    }
  }

  /// Resolve a fragment into a fully inlined tree.
  ///
  /// Boolean schemas come out as `{}` (true) and `{"not": {}}` (false).
  pub fn resolve(&mut self, fragment: &Value) -> Value {
    normalize_boolean(self.resolve_raw(fragment))
  }

  /// Follow a chain of `$ref` objects (request bodies, responses,
  /// parameters) to the object they point at.
  pub fn dereference(&self, value: &'a Value) -> Option<&'a Value> {
    let mut current = value;
    let mut seen = HashSet::new();

    while let Some(reference) = current.get("$ref").and_then(Value::as_str) {
      if !seen.insert(reference) {
        warn!(reference, "cyclic reference chain");
        return None;
      }
      match self.document.lookup(reference) {
        Some(target) => current = target,
        None => {
          warn!(reference, "unresolvable reference");
          return None;
        }
      }
    }

    Some(current)
  }

  /// Resolve without normalizing booleans, so `allOf` folding can see them.
  fn resolve_raw(&mut self, fragment: &Value) -> Value {
    match fragment {
      Value::Object(map) => match map.get("$ref") {
        Some(Value::String(reference)) => self.resolve_reference(reference, map),
        _ => self.resolve_object(map),
      },
      Value::Array(items) => Value::Array(items.iter().map(|item| self.resolve(item)).collect()),
      other => other.clone(),
    }
  }

  fn resolve_reference(&mut self, reference: &str, node: &Map<String, Value>) -> Value {
    let mut siblings = node.clone();
    siblings.remove("$ref");

    if self.in_progress.contains(reference) {
      debug!(reference, "cycle detected, keeping reference marker");
      if siblings.is_empty() {
        return json!({ "$ref": reference });
      }
      return match self.resolve_object(&siblings) {
        Value::Object(mut local) => {
          local.insert("$ref".to_string(), Value::String(reference.to_string()));
          Value::Object(local)
        }
        other => other,
      };
    }

    let document = self.document;
    let Some(target) = document.lookup(reference) else {
      warn!(reference, "unresolvable schema reference");
      return Value::Object(node.clone());
    };

    self.in_progress.insert(reference.to_string());
    let resolved = self.resolve_raw(target);
    let result = if siblings.is_empty() {
      resolved
    } else {
      let local = self.resolve_object(&siblings);
      merge_schemas(&resolved, &local)
    };
    self.in_progress.remove(reference);

    result
  }

  fn resolve_object(&mut self, map: &Map<String, Value>) -> Value {
    let mut resolved = Map::new();

    for (key, value) in map {
      let child = match (key.as_str(), value) {
        ("allOf", Value::Array(_)) => continue,
        ("properties", Value::Object(properties)) => Value::Object(
          properties
            .iter()
            .map(|(name, schema)| (name.clone(), self.resolve(schema)))
            .collect(),
        ),
        ("additionalProperties", Value::Bool(_)) => value.clone(),
        ("items" | "additionalProperties" | "not", _) => self.resolve(value),
        ("oneOf" | "anyOf", Value::Array(branches)) => {
          Value::Array(branches.iter().map(|branch| self.resolve(branch)).collect())
        }
        _ => value.clone(),
      };
      resolved.insert(key.clone(), child);
    }

    let Some(Value::Array(members)) = map.get("allOf") else {
      return Value::Object(resolved);
    };

    let mut folded = if resolved.is_empty() {
      None
    } else {
      Some(Value::Object(resolved))
    };
    for member in members {
      let member = self.resolve_raw(member);
      folded = Some(match folded {
        None => member,
        Some(base) => merge_schemas(&base, &member),
      });
    }

    folded.unwrap_or_else(|| json!({}))
  }
}

/// Resolve a fragment against a document with a fresh cycle guard.
pub fn resolve_schema(fragment: &Value, document: &ApiDocument) -> Value {
  SchemaResolver::new(document).resolve(fragment)
}

fn normalize_boolean(value: Value) -> Value {
  match value {
    Value::Bool(true) => json!({}),
    Value::Bool(false) => json!({ "not": {} }),
    other => other,
  }
}
