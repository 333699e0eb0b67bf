use cobalt_http::HttpResponse;
use cobalt_state::ExecutionState;
use serde_json::{Map, Value};
use tracing::debug;

use crate::ast::{Expression, ResponseRef};

const EXPRESSION_ROOTS: [&str; 4] = ["$inputs.", "$steps.", "$response.", "$statusCode"];

/// Evaluates runtime expressions against a run's state and, when present,
/// the response of the step being processed.
#[derive(Debug)]
pub struct ExpressionEvaluator<'a> {
  state: &'a ExecutionState,
  response: Option<&'a HttpResponse>,
  body: Option<Value>,
}

impl<'a> ExpressionEvaluator<'a> {
  pub fn new(state: &'a ExecutionState, response: Option<&'a HttpResponse>) -> Self {
    Self {
      state,
      response,
      body: response.map(HttpResponse::body_value),
    }
  }

  /// Evaluate an expression string. Unrecognized forms are absent.
  pub fn evaluate(&self, expression: &str) -> Option<Value> {
    match Expression::parse(expression) {
      Ok(parsed) => self.evaluate_parsed(&parsed),
      Err(err) => {
        debug!(error = %err, "expression not recognized");
        None
      }
    }
  }

  pub fn evaluate_parsed(&self, expression: &Expression) -> Option<Value> {
    match expression {
      Expression::Input { name, pointer } => at_pointer(self.state.inputs().get(name)?, pointer),
      Expression::StepOutput {
        step_id,
        name,
        pointer,
      } => at_pointer(self.state.outputs_of(step_id)?.get(name)?, pointer),
      Expression::Response(ResponseRef::Body { pointer }) => at_pointer(self.body.as_ref()?, pointer),
      Expression::Response(ResponseRef::Header { name: Some(name) }) => self
        .response?
        .header(name)
        .map(|value| Value::String(value.to_string())),
      Expression::Response(ResponseRef::Header { name: None }) => {
        let headers: Map<String, Value> = self
          .response?
          .headers
          .iter()
          .map(|(k, v)| (k.clone(), Value::String(v.clone())))
          .collect();
        Some(Value::Object(headers))
      }
      Expression::StatusCode => self.response.map(|r| Value::from(r.status_code)),
    }
  }

  /// Substitute expressions throughout a payload template.
  ///
  /// Whole-string expressions keep the type of their value; an absent one
  /// becomes `null`. Objects and arrays are walked recursively.
  pub fn resolve_value(&self, template: &Value) -> Value {
    match template {
      Value::String(text) => self.resolve_string(text).unwrap_or(Value::Null),
      Value::Array(items) => Value::Array(items.iter().map(|item| self.resolve_value(item)).collect()),
      Value::Object(map) => Value::Object(
        map
          .iter()
          .map(|(key, value)| (key.clone(), self.resolve_value(value)))
          .collect(),
      ),
      other => other.clone(),
    }
  }

  /// Resolve one string.
  ///
  /// A string that is exactly one expression evaluates to its value, and
  /// `None` when that value is absent. Otherwise each embedded `$...` or
  /// `{$...}` token is replaced by its string form; unresolved tokens are
  /// left as written.
  pub fn resolve_string(&self, text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if is_single_token(trimmed)
      && let Ok(expression) = Expression::parse(trimmed)
    {
      let value = self.evaluate_parsed(&expression);
      if value.is_none() {
        debug!(expression = %expression, "expression resolved to nothing");
      }
      return value;
    }

    if !text.contains('$') {
      return Some(Value::String(text.to_string()));
    }
    Some(Value::String(self.substitute_embedded(text)))
  }

  fn substitute_embedded(&self, text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('$') {
      let braced = start > 0 && rest[..start].ends_with('{');
      let prefix_end = if braced { start - 1 } else { start };
      output.push_str(&rest[..prefix_end]);

      let candidate = &rest[start..];
      let (token_len, consumed) = if braced {
        match candidate.find('}') {
          Some(end) => (end, end + 1),
          None => (token_length(candidate), token_length(candidate)),
        }
      } else {
        let len = token_length(candidate);
        (len, len)
      };

      let token = &candidate[..token_len];
      let original = &rest[prefix_end..start + consumed];
      match self.resolve_token(token) {
        Some(value) => output.push_str(&to_text(&value)),
        None => {
          debug!(token, "leaving unresolved expression in place");
          output.push_str(original);
        }
      }

      rest = &rest[start + consumed.max(1)..];
    }

    output.push_str(rest);
    output
  }

  fn resolve_token(&self, token: &str) -> Option<Value> {
    if !EXPRESSION_ROOTS.iter().any(|root| token.starts_with(root)) {
      return None;
    }
    self.evaluate(token)
  }
}

/// Evaluate one expression against a state and optional response.
pub fn evaluate_expression(
  expression: &str,
  state: &ExecutionState,
  response: Option<&HttpResponse>,
) -> Option<Value> {
  ExpressionEvaluator::new(state, response).evaluate(expression)
}

/// String form used for embedding and for regex matching.
pub fn to_text(value: &Value) -> String {
  match value {
    Value::String(text) => text.clone(),
    other => other.to_string(),
  }
}

fn at_pointer(value: &Value, pointer: &str) -> Option<Value> {
  if pointer.is_empty() {
    return Some(value.clone());
  }
  value.pointer(pointer).cloned()
}

fn is_single_token(text: &str) -> bool {
  let inner = text
    .strip_prefix('{')
    .and_then(|t| t.strip_suffix('}'))
    .unwrap_or(text);
  inner.starts_with('$') && !inner.contains(char::is_whitespace) && !inner.contains('{')
}

/// Length of the expression token at the start of `text`, without any
/// trailing sentence punctuation.
fn token_length(text: &str) -> usize {
  let end = text
    .char_indices()
    .skip(1)
    .find(|(_, c)| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '#' | '/' | '~')))
    .map(|(i, _)| i)
    .unwrap_or(text.len());
  text[..end].trim_end_matches('.').len()
}
