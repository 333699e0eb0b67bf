//! Cobalt Workflow Engine
//!
//! Runs workflows one step at a time. Each step calls an HTTP operation
//! described by an API document; data flows between steps through runtime
//! expressions.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      WorkflowEngine                         │
//! │  - start_workflow(id, inputs) → execution id                │
//! │  - execute_next_step(execution id) → StepResult             │
//! │  - owns the RunRegistry (execution id → ExecutionState)     │
//! └─────────────────────────────────────────────────────────────┘
//!          │                    │                     │
//!          ▼                    ▼                     ▼
//! ┌──────────────────┐  ┌──────────────────┐  ┌──────────────────┐
//! │ resolve_operation│  │  build_request   │  │ success criteria │
//! │  (cobalt-schema) │  │  (cobalt-expr)   │  │   and outputs    │
//! └──────────────────┘  └──────────────────┘  └──────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │       CredentialProvider  ──►  Transport  ──►  response     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use cobalt_engine::{Collaborators, EngineConfig, WorkflowEngine};
//!
//! let engine = WorkflowEngine::new(document, collaborators, EngineConfig::default())?;
//! let execution_id = engine.start_workflow("login-flow", inputs)?;
//!
//! loop {
//!     let result = engine.execute_next_step(&execution_id).await?;
//!     if result.is_terminal() {
//!         break;
//!     }
//! }
//! ```

mod engine;
mod error;
mod events;
mod operation;
mod registry;
mod request;
mod result;

pub use engine::{Collaborators, EngineConfig, WorkflowEngine};
pub use error::EngineError;
pub use events::{ChannelNotifier, ExecutionEvent, ExecutionNotifier, NoopNotifier};
pub use operation::{ResolvedOperation, resolve_operation};
pub use registry::{RunHandle, RunRegistry};
pub use request::{apply_credentials, build_request};
pub use result::StepResult;
