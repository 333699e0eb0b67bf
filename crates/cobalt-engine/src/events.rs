//! Execution events and notifiers for observability.
//!
//! One event per run and step transition, emitted while the engine holds
//! the run.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Events emitted during workflow execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecutionEvent {
  WorkflowStarted {
    execution_id: String,
    workflow_id: String,
  },

  StepStarted {
    execution_id: String,
    step_id: String,
  },

  StepCompleted {
    execution_id: String,
    step_id: String,
    outputs: serde_json::Value,
  },

  StepFailed {
    execution_id: String,
    step_id: String,
    error: String,
  },

  WorkflowCompleted {
    execution_id: String,
    outputs: serde_json::Value,
  },

  WorkflowFailed { execution_id: String, error: String },
}

/// Receives execution events.
///
/// The engine calls `notify` synchronously while it holds the run, so
/// implementations should hand events off rather than block.
pub trait ExecutionNotifier: Send + Sync {
  fn notify(&self, event: ExecutionEvent);
}

/// Discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: ExecutionEvent) {}
}

/// Forwards events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  // Unbounded so a slow consumer never stalls a run; volume is a handful of
  // events per step.
  sender: mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
    Self { sender }
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: ExecutionEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}
