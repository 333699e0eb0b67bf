//! Parsed runtime expressions.
//!
//! Each expression string is parsed once into an [`Expression`]. Sub-paths
//! are normalized to JSON pointers, so `$response.body.a.b` and
//! `$response.body#/a/b` parse to the same value.

use std::fmt;
use std::str::FromStr;

use crate::error::ExprError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
  /// `$inputs.<name>[.<path> | #<pointer>]`
  Input { name: String, pointer: String },
  /// `$steps.<stepId>.outputs.<name>[.<path> | #<pointer>]`
  StepOutput {
    step_id: String,
    name: String,
    pointer: String,
  },
  /// `$response.body[...]` or `$response.header.<Name>`
  Response(ResponseRef),
  /// `$statusCode`
  StatusCode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseRef {
  /// JSON pointer into the body. Empty means the whole body.
  Body { pointer: String },
  /// A single header, or all headers when `name` is `None`.
  Header { name: Option<String> },
}

impl Expression {
  pub fn parse(text: &str) -> Result<Self, ExprError> {
    let unrecognized = || ExprError::Unrecognized {
      expression: text.to_string(),
    };
    let text = text.trim();
    let text = text
      .strip_prefix('{')
      .and_then(|t| t.strip_suffix('}'))
      .unwrap_or(text);

    if text == "$statusCode" {
      return Ok(Expression::StatusCode);
    }

    if let Some(rest) = text.strip_prefix("$inputs.") {
      let (name, pointer) = split_name(rest).ok_or_else(unrecognized)?;
      return Ok(Expression::Input { name, pointer });
    }

    if let Some(rest) = text.strip_prefix("$steps.") {
      let (step_id, rest) = rest.split_once(".outputs.").ok_or_else(unrecognized)?;
      if step_id.is_empty() {
        return Err(unrecognized());
      }
      let (name, pointer) = split_name(rest).ok_or_else(unrecognized)?;
      return Ok(Expression::StepOutput {
        step_id: step_id.to_string(),
        name,
        pointer,
      });
    }

    if let Some(rest) = text.strip_prefix("$response.") {
      return parse_response(rest)
        .map(Expression::Response)
        .ok_or_else(unrecognized);
    }

    Err(unrecognized())
  }
}

impl FromStr for Expression {
  type Err = ExprError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Expression::parse(s)
  }
}

impl fmt::Display for Expression {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Expression::Input { name, pointer } => write!(f, "$inputs.{}{}", name, pointer_suffix(pointer)),
      Expression::StepOutput {
        step_id,
        name,
        pointer,
      } => write!(
        f,
        "$steps.{}.outputs.{}{}",
        step_id,
        name,
        pointer_suffix(pointer)
      ),
      Expression::Response(ResponseRef::Body { pointer }) => {
        write!(f, "$response.body{}", pointer_suffix(pointer))
      }
      Expression::Response(ResponseRef::Header { name: Some(name) }) => {
        write!(f, "$response.header.{}", name)
      }
      Expression::Response(ResponseRef::Header { name: None }) => write!(f, "$response.header"),
      Expression::StatusCode => write!(f, "$statusCode"),
    }
  }
}

fn pointer_suffix(pointer: &str) -> String {
  if pointer.is_empty() {
    String::new()
  } else {
    format!("#{}", pointer)
  }
}

fn parse_response(rest: &str) -> Option<ResponseRef> {
  let split = rest.find(&['.', '#'][..]).unwrap_or(rest.len());
  let (container, remainder) = rest.split_at(split);

  match container {
    "body" => Some(ResponseRef::Body {
      pointer: to_pointer(remainder)?,
    }),
    "header" | "headers" => match remainder.strip_prefix('.') {
      Some(name) if !name.is_empty() => Some(ResponseRef::Header {
        name: Some(name.to_string()),
      }),
      None if remainder.is_empty() => Some(ResponseRef::Header { name: None }),
      _ => None,
    },
    _ => None,
  }
}

/// Split `name[.path | #pointer]` into the name and a JSON pointer.
fn split_name(rest: &str) -> Option<(String, String)> {
  let split = rest.find(&['.', '#'][..]).unwrap_or(rest.len());
  let (name, remainder) = rest.split_at(split);
  if name.is_empty() {
    return None;
  }
  Some((name.to_string(), to_pointer(remainder)?))
}

/// Convert `.a.b` or `#/a/b` to `/a/b`. An empty path, `#` or `#/` is the
/// whole value.
fn to_pointer(remainder: &str) -> Option<String> {
  if remainder.is_empty() {
    return Some(String::new());
  }
  if let Some(pointer) = remainder.strip_prefix('#') {
    return match pointer {
      "" | "/" => Some(String::new()),
      p if p.starts_with('/') => Some(p.to_string()),
      _ => None,
    };
  }

  let dotted = remainder.strip_prefix('.')?;
  if dotted.is_empty() || dotted.split('.').any(str::is_empty) {
    return None;
  }
  Some(
    dotted
      .split('.')
      .map(|segment| format!("/{}", segment.replace('~', "~0").replace('/', "~1")))
      .collect(),
  )
}
