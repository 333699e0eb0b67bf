use crate::status::ExecutionStatus;

/// Errors raised when a run record is mutated out of order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
  #[error("invalid status transition from {from} to {to}")]
  InvalidTransition {
    from: ExecutionStatus,
    to: ExecutionStatus,
  },

  #[error("outputs for step '{step_id}' already recorded")]
  OutputsAlreadyRecorded { step_id: String },
}
