//! Success criteria.
//!
//! A simple condition is `<operand> <op> <operand>`, optionally combined with
//! `&&` and `||` (`&&` binds tighter). Operands are runtime expressions or
//! literals: quoted strings, numbers, `true`, `false`, `null` and bare words.
//! A condition without an operator tests the truthiness of its operand.

use std::cmp::Ordering;

use cobalt_config::{Criterion, CriterionType};
use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::ast::Expression;
use crate::error::ExprError;
use crate::evaluator::{ExpressionEvaluator, to_text};

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
  Compare {
    left: Operand,
    op: ComparisonOp,
    right: Operand,
  },
  Truthy(Operand),
  And(Vec<Condition>),
  Or(Vec<Condition>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
  Expression(Expression),
  Literal(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
  Equal,
  NotEqual,
  LessThan,
  LessThanOrEqual,
  GreaterThan,
  GreaterThanOrEqual,
}

const OPERATORS: [(&str, ComparisonOp); 6] = [
  ("==", ComparisonOp::Equal),
  ("!=", ComparisonOp::NotEqual),
  ("<=", ComparisonOp::LessThanOrEqual),
  (">=", ComparisonOp::GreaterThanOrEqual),
  ("<", ComparisonOp::LessThan),
  (">", ComparisonOp::GreaterThan),
];

impl Condition {
  pub fn parse(text: &str) -> Result<Self, ExprError> {
    let alternatives = split_outside_quotes(text, "||");
    if alternatives.len() > 1 {
      return alternatives
        .into_iter()
        .map(Condition::parse)
        .collect::<Result<_, _>>()
        .map(Condition::Or);
    }

    let conjuncts = split_outside_quotes(text, "&&");
    if conjuncts.len() > 1 {
      return conjuncts
        .into_iter()
        .map(Condition::parse)
        .collect::<Result<_, _>>()
        .map(Condition::And);
    }

    let text = text.trim();
    if text.is_empty() {
      return Err(ExprError::InvalidCondition {
        condition: text.to_string(),
        message: "empty condition".to_string(),
      });
    }

    match find_operator(text) {
      Some((index, token, op)) => {
        let left = parse_operand(text, &text[..index])?;
        let right = parse_operand(text, &text[index + token.len()..])?;
        Ok(Condition::Compare { left, op, right })
      }
      None => Ok(Condition::Truthy(parse_operand(text, text)?)),
    }
  }

  pub fn evaluate(&self, evaluator: &ExpressionEvaluator<'_>) -> bool {
    match self {
      Condition::Compare { left, op, right } => compare(
        operand_value(left, evaluator),
        *op,
        operand_value(right, evaluator),
      ),
      Condition::Truthy(operand) => is_truthy(operand_value(operand, evaluator).as_ref()),
      Condition::And(conditions) => conditions.iter().all(|c| c.evaluate(evaluator)),
      Condition::Or(conditions) => conditions.iter().any(|c| c.evaluate(evaluator)),
    }
  }
}

impl<'a> ExpressionEvaluator<'a> {
  /// Whether one criterion holds. Conditions that fail to parse, and
  /// criterion types that are not supported, do not hold.
  pub fn check_criterion(&self, criterion: &Criterion) -> bool {
    match criterion.kind() {
      CriterionType::Simple => match Condition::parse(&criterion.condition) {
        Ok(condition) => condition.evaluate(self),
        Err(err) => {
          warn!(error = %err, "unparseable success criterion");
          false
        }
      },
      CriterionType::Regex => {
        let Some(context) = criterion.context.as_deref() else {
          warn!(condition = %criterion.condition, "regex criterion without context");
          return false;
        };
        let Some(value) = self.evaluate(context) else {
          return false;
        };
        match Regex::new(&criterion.condition) {
          Ok(regex) => regex.is_match(&to_text(&value)),
          Err(err) => {
            warn!(pattern = %criterion.condition, error = %err, "invalid criterion pattern");
            false
          }
        }
      }
      kind => {
        warn!(kind = ?kind, condition = %criterion.condition, "unsupported criterion type");
        false
      }
    }
  }

  /// Check criteria in order, returning the first one that does not hold.
  pub fn first_unmet<'c>(&self, criteria: &'c [Criterion]) -> Option<&'c Criterion> {
    criteria.iter().find(|criterion| !self.check_criterion(criterion))
  }
}

fn operand_value(operand: &Operand, evaluator: &ExpressionEvaluator<'_>) -> Option<Value> {
  match operand {
    Operand::Expression(expression) => evaluator.evaluate_parsed(expression),
    Operand::Literal(value) => Some(value.clone()),
  }
}

fn parse_operand(condition: &str, text: &str) -> Result<Operand, ExprError> {
  let text = text.trim();
  if text.is_empty() {
    return Err(ExprError::InvalidCondition {
      condition: condition.to_string(),
      message: "missing operand".to_string(),
    });
  }

  if text.starts_with('$') || text.starts_with("{$") {
    return Expression::parse(text)
      .map(Operand::Expression)
      .map_err(|err| ExprError::InvalidCondition {
        condition: condition.to_string(),
        message: err.to_string(),
      });
  }

  for quote in ['\'', '"'] {
    if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
      return Ok(Operand::Literal(Value::String(text[1..text.len() - 1].to_string())));
    }
  }

  let literal = match text {
    "true" => Value::Bool(true),
    "false" => Value::Bool(false),
    "null" => Value::Null,
    _ => match text.parse::<i64>() {
      Ok(n) => Value::from(n),
      Err(_) => match text.parse::<f64>() {
        Ok(f) if f.is_finite() => Value::from(f),
        _ => Value::String(text.to_string()),
      },
    },
  };
  Ok(Operand::Literal(literal))
}

/// Absent operands compare as `null`. Numeric strings compare as numbers.
fn compare(left: Option<Value>, op: ComparisonOp, right: Option<Value>) -> bool {
  let left = left.unwrap_or(Value::Null);
  let right = right.unwrap_or(Value::Null);

  let ordering = match (as_number(&left), as_number(&right)) {
    (Some(l), Some(r)) => l.partial_cmp(&r),
    _ => match (&left, &right) {
      (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
      _ if left == right => Some(Ordering::Equal),
      _ => None,
    },
  };

  match op {
    ComparisonOp::Equal => ordering == Some(Ordering::Equal),
    ComparisonOp::NotEqual => ordering != Some(Ordering::Equal),
    ComparisonOp::LessThan => ordering == Some(Ordering::Less),
    ComparisonOp::LessThanOrEqual => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
    ComparisonOp::GreaterThan => ordering == Some(Ordering::Greater),
    ComparisonOp::GreaterThanOrEqual => {
      matches!(ordering, Some(Ordering::Greater | Ordering::Equal))
    }
  }
}

fn as_number(value: &Value) -> Option<f64> {
  match value {
    Value::Number(n) => n.as_f64(),
    Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
    _ => None,
  }
}

fn is_truthy(value: Option<&Value>) -> bool {
  match value {
    None | Some(Value::Null) => false,
    Some(Value::Bool(b)) => *b,
    Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
    Some(Value::String(s)) => !s.is_empty(),
    Some(Value::Array(items)) => !items.is_empty(),
    Some(Value::Object(map)) => !map.is_empty(),
  }
}

fn find_operator(text: &str) -> Option<(usize, &'static str, ComparisonOp)> {
  let mut quote = None;
  for (index, c) in text.char_indices() {
    match quote {
      Some(q) if c == q => quote = None,
      Some(_) => {}
      None if c == '\'' || c == '"' => quote = Some(c),
      None => {
        let rest = &text[index..];
        if let Some((token, op)) = OPERATORS.iter().find(|(token, _)| rest.starts_with(token)) {
          return Some((index, *token, *op));
        }
      }
    }
  }
  None
}

fn split_outside_quotes<'t>(text: &'t str, separator: &str) -> Vec<&'t str> {
  let mut parts = Vec::new();
  let mut quote = None;
  let mut start = 0;
  let mut skip_until = 0;

  for (index, c) in text.char_indices() {
    if index < skip_until {
      continue;
    }
    match quote {
      Some(q) if c == q => quote = None,
      Some(_) => {}
      None if c == '\'' || c == '"' => quote = Some(c),
      None if text[index..].starts_with(separator) => {
        parts.push(&text[start..index]);
        start = index + separator.len();
        skip_until = start;
      }
      None => {}
    }
  }

  parts.push(&text[start..]);
  parts
}
