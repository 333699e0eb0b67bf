/// Errors raised while parsing expressions and conditions.
///
/// Evaluation itself never fails: a reference that cannot be resolved is
/// absent, not an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExprError {
  #[error("unrecognized expression: {expression}")]
  Unrecognized { expression: String },

  #[error("invalid condition '{condition}': {message}")]
  InvalidCondition { condition: String, message: String },
}
