//! Cobalt Expressions
//!
//! The runtime expression language that moves data between steps.
//!
//! ```text
//! $inputs.<name>                         workflow inputs
//! $steps.<stepId>.outputs.<name>         outputs of an earlier step
//! $response.body[.a.b | #/a/b]           body of the current response
//! $response.header.<Name>                a response header
//! $statusCode                            status of the current response
//! ```
//!
//! Evaluation is soft: a reference that does not resolve yields `None`
//! rather than an error. Whether that matters is decided later, usually by a
//! success criterion.
//!
//! # Usage
//!
//! ```ignore
//! let evaluator = ExpressionEvaluator::new(&state, Some(&response));
//! let token = evaluator.evaluate("$response.body.token");
//! let body = evaluator.resolve_value(&step.request_body.payload);
//! let unmet = evaluator.first_unmet(&step.success_criteria);
//! ```

mod ast;
mod criteria;
mod error;
mod evaluator;
mod transform;

pub use ast::{Expression, ResponseRef};
pub use criteria::{ComparisonOp, Condition, Operand};
pub use error::ExprError;
pub use evaluator::{ExpressionEvaluator, evaluate_expression, to_text};
pub use transform::apply_regex_transforms;
