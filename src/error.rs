use thiserror::Error;

/// Errors that can occur within the `worker_orchestra` pool.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
  #[error("Invalid callable: {0}")]
  InvalidCallable(String),

  #[error("Number of callable params ({expected}) and number of provided args ({provided}) don't match")]
  ArityMismatch { expected: usize, provided: usize },

  #[error("param[{position}] must be `{expected}` not `{found}`")]
  TypeMismatch {
    position: usize,
    expected: &'static str,
    found: &'static str,
  },

  #[error("param[{position}] of type `{found}` doesn't implement capability `{capability}`")]
  CapabilityNotSatisfied {
    position: usize,
    capability: &'static str,
    found: &'static str,
  },

  #[error("Task not found: {0}")]
  TaskNotFound(String),

  #[error("Run deadline exceeded before all awaited tasks completed")]
  DeadlineExceeded,

  #[error("Run was cancelled before all awaited tasks completed")]
  Cancelled,
}

/// Errors raised while applying stored arguments to a callable.
///
/// These never reach the caller of `run`; the invocation boundary logs them
/// and leaves the task's results empty.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvokeError {
  #[error("expected {expected} args, got {provided}")]
  Arity { expected: usize, provided: usize },

  #[error("arg[{position}] could not be extracted as `{expected}` (found `{found}`)")]
  Extract {
    position: usize,
    expected: &'static str,
    found: &'static str,
  },
}
