use crate::function::Function;
use crate::handle::TaskId;
use crate::value::Value;

use parking_lot::Mutex;

/// Internal representation of a task registered with the pool.
///
/// Everything but `results` is fixed at registration.
pub(crate) struct Task {
  pub(crate) task_id: TaskId,
  pub(crate) function: Function,
  pub(crate) args: Vec<Value>,
  pub(crate) awaited: bool,
  results: Mutex<Vec<Value>>,
}

impl Task {
  pub(crate) fn new(task_id: TaskId, function: Function, args: Vec<Value>, awaited: bool) -> Self {
    Self {
      task_id,
      function,
      args,
      awaited,
      results: Mutex::new(Vec::new()),
    }
  }

  /// A snapshot of the last stored results; empty until an invocation returns.
  pub(crate) fn results(&self) -> Vec<Value> {
    self.results.lock().clone()
  }

  /// Replaces the stored results. Only the unit running this task writes here.
  pub(crate) fn store_results(&self, values: Vec<Value>) {
    *self.results.lock() = values;
  }
}
