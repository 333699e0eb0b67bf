//! Cobalt State
//!
//! The mutable record of one workflow run.
//!
//! ```text
//!   Pending ──► Running ──► StepComplete ──► Running ──► ...
//!                  │              │
//!                  ├──────────────┴──► WorkflowComplete   (terminal)
//!                  └─────────────────► WorkflowFailed     (terminal)
//! ```
//!
//! Terminal statuses are absorbing: every transition out of them is
//! rejected. Step outputs are write-once.

mod error;
mod failure;
mod state;
mod status;

pub use error::StateError;
pub use failure::{FailureReason, StepFailure};
pub use state::ExecutionState;
pub use status::ExecutionStatus;
