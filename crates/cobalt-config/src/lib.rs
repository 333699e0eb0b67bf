//! Cobalt Config
//!
//! This crate contains the serializable workflow document types for cobalt.
//! A workflow document names one or more API sources and a set of workflows,
//! each an ordered list of steps that call operations on those sources.
//!
//! Documents can be loaded from:
//! - JSON files (`.json`)
//! - YAML files (`.yaml` / `.yml`)
//!
//! The engine takes these types, looks up each step's operation in the named
//! API documents, and executes the steps in document order.

mod criterion;
mod document;
mod error;
mod load;
mod parameter;
mod step;

pub use criterion::{Criterion, CriterionType, CriterionTypeDef};
pub use document::{Info, SourceDescription, Workflow, WorkflowDocument};
pub use error::ConfigError;
pub use load::{DocumentFormat, load_value, load_workflow_document, parse_value};
pub use parameter::{Parameter, ParameterLocation, PayloadReplacement, RegexTransform, RequestBody};
pub use step::{OperationRef, Step};
