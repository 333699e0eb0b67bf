use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// HTTP methods that may appear as keys of a path item.
pub const HTTP_METHODS: [&str; 8] = [
  "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// A parsed API description document.
///
/// Wraps the raw JSON tree and exposes the parts the engine needs: paths,
/// operations, servers, security and local `$ref` lookup. The document is
/// immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiDocument {
  raw: Value,
}

/// Where an operation lives in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationLocation {
  pub path: String,
  pub method: String,
}

impl ApiDocument {
  pub fn new(raw: Value) -> Self {
    Self { raw }
  }

  pub fn raw(&self) -> &Value {
    &self.raw
  }

  /// Look up a local reference such as `#/components/schemas/Pet`.
  ///
  /// Returns `None` for external references and for pointers that do not
  /// resolve.
  pub fn lookup(&self, reference: &str) -> Option<&Value> {
    let pointer = reference.strip_prefix('#')?;
    if pointer.is_empty() {
      return Some(&self.raw);
    }
    self.raw.pointer(pointer)
  }

  pub fn path_item(&self, path: &str) -> Option<&Value> {
    self.raw.get("paths")?.get(path)
  }

  pub fn operation(&self, path: &str, method: &str) -> Option<&Value> {
    self.path_item(path)?.get(method.to_lowercase())
  }

  /// Find an operation by its `operationId`.
  pub fn find_operation(&self, operation_id: &str) -> Option<OperationLocation> {
    let paths = self.raw.get("paths")?.as_object()?;
    for (path, item) in paths {
      for method in HTTP_METHODS {
        let matches = item
          .get(method)
          .and_then(|op| op.get("operationId"))
          .and_then(Value::as_str)
          == Some(operation_id);
        if matches {
          return Some(OperationLocation {
            path: path.clone(),
            method: method.to_string(),
          });
        }
      }
    }
    None
  }

  /// Base URL from the first server entry, with server variables replaced
  /// by their defaults and any trailing slash removed.
  pub fn base_url(&self) -> Option<String> {
    let server = self.raw.get("servers")?.as_array()?.first()?;
    let mut url = server.get("url")?.as_str()?.to_string();

    if let Some(variables) = server.get("variables").and_then(Value::as_object) {
      for (name, variable) in variables {
        if let Some(default) = variable.get("default").and_then(Value::as_str) {
          url = url.replace(&format!("{{{}}}", name), default);
        }
      }
    }

    Some(url.trim_end_matches('/').to_string())
  }

  /// Security requirements that apply to an operation.
  ///
  /// An operation-level `security` array (even an empty one) overrides the
  /// document-level default.
  pub fn security_for(&self, path: &str, method: &str) -> Vec<Value> {
    let operation_level = self
      .operation(path, method)
      .and_then(|op| op.get("security"))
      .and_then(Value::as_array);
    let document_level = self.raw.get("security").and_then(Value::as_array);

    operation_level
      .or(document_level)
      .cloned()
      .unwrap_or_default()
  }

  pub fn security_schemes(&self) -> Option<&serde_json::Map<String, Value>> {
    self
      .raw
      .get("components")?
      .get("securitySchemes")?
      .as_object()
  }
}

/// Supplies parsed API documents by source name.
pub trait DocumentProvider: Send + Sync {
  fn document(&self, source_name: &str) -> Option<&ApiDocument>;

  /// Source names in a stable order, used when an operation id is not
  /// qualified with a source.
  fn source_names(&self) -> Vec<String>;
}

impl DocumentProvider for HashMap<String, ApiDocument> {
  fn document(&self, source_name: &str) -> Option<&ApiDocument> {
    self.get(source_name)
  }

  fn source_names(&self) -> Vec<String> {
    let mut names: Vec<String> = self.keys().cloned().collect();
    names.sort();
    names
  }
}

impl DocumentProvider for BTreeMap<String, ApiDocument> {
  fn document(&self, source_name: &str) -> Option<&ApiDocument> {
    self.get(source_name)
  }

  fn source_names(&self) -> Vec<String> {
    self.keys().cloned().collect()
  }
}
