//! Run registry.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use cobalt_state::ExecutionState;
use tokio::sync::Mutex;

/// Shared handle to one run's state. The mutex serializes step execution.
pub type RunHandle = Arc<Mutex<ExecutionState>>;

/// Maps execution ids to run state.
///
/// Owned by a single engine; two engines never share runs.
#[derive(Debug, Default)]
pub struct RunRegistry {
  runs: RwLock<HashMap<String, RunHandle>>,
}

impl RunRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a new run under its execution id.
  pub fn insert(&self, state: ExecutionState) -> RunHandle {
    let execution_id = state.execution_id().to_string();
    let handle = Arc::new(Mutex::new(state));
    let mut runs = self.runs.write().unwrap_or_else(PoisonError::into_inner);
    runs.insert(execution_id, handle.clone());
    handle
  }

  pub fn get(&self, execution_id: &str) -> Option<RunHandle> {
    let runs = self.runs.read().unwrap_or_else(PoisonError::into_inner);
    runs.get(execution_id).cloned()
  }

  pub fn execution_ids(&self) -> Vec<String> {
    let runs = self.runs.read().unwrap_or_else(PoisonError::into_inner);
    let mut ids: Vec<String> = runs.keys().cloned().collect();
    ids.sort();
    ids
  }

  pub fn len(&self) -> usize {
    self.runs.read().unwrap_or_else(PoisonError::into_inner).len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}
