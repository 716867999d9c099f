use std::borrow::Borrow;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// The handle returned when a task is registered. It is the only key
/// accepted by [`WorkerPool::get_results`](crate::WorkerPool::get_results).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(String);

impl TaskId {
  /// Builds an id from wall-clock nanoseconds and the pool's sequence
  /// number. The sequence alone keeps ids unique within one pool.
  pub(crate) fn generate(seq: u64) -> Self {
    let nanos = SystemTime::now()
      .duration_since(UNIX_EPOCH)
      .map(|d| d.as_nanos())
      .unwrap_or_default();
    TaskId(format!("{nanos:x}-{seq:x}"))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for TaskId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl AsRef<str> for TaskId {
  fn as_ref(&self) -> &str {
    &self.0
  }
}

impl Borrow<str> for TaskId {
  fn borrow(&self) -> &str {
    &self.0
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashSet;

  #[test]
  fn test_ids_are_unique_for_distinct_sequence_numbers() {
    let ids: HashSet<TaskId> = (0..1000).map(TaskId::generate).collect();
    assert_eq!(ids.len(), 1000);
  }

  #[test]
  fn test_id_ends_with_hex_sequence() {
    let id = TaskId::generate(255);
    assert!(id.as_str().ends_with("-ff"));
    assert_eq!(id.to_string(), id.as_str());
  }
}
