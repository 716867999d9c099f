use crate::context::RunContext;
use crate::error::PoolError;
use crate::handle::TaskId;
use crate::task::Task;
use crate::value::Value;
use crate::wait_group::{WaitGroup, WaitGuard};

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::thread;

use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::runtime::Handle as TokioHandle;
use tokio::sync::oneshot;
use tracing::{debug, error, info, info_span, trace, warn, Instrument};

/// A pool of registered callables that are all launched together by
/// [`run`](WorkerPool::run).
///
/// Clones share the same tasks and state. The pool assumes a single caller:
/// registering while a `run` is in progress is ignored.
#[derive(Clone)]
pub struct WorkerPool {
  shared: Arc<PoolShared>,
}

struct PoolShared {
  pool_name: Arc<String>,
  tokio_handle: TokioHandle,
  tasks: RwLock<Vec<Arc<Task>>>,
  // Same tasks as `tasks`, keyed for id lookup only; both are append-only.
  task_index: DashMap<TaskId, Arc<Task>>,
  running: AtomicBool,
  id_seq: AtomicU64,
  in_flight: Arc<WaitGroup>,
}

impl WorkerPool {
  pub fn new(tokio_handle: TokioHandle, pool_name: &str) -> Self {
    Self {
      shared: Arc::new(PoolShared {
        pool_name: Arc::new(pool_name.to_string()),
        tokio_handle,
        tasks: RwLock::new(Vec::new()),
        task_index: DashMap::new(),
        running: AtomicBool::new(false),
        id_seq: AtomicU64::new(0),
        in_flight: WaitGroup::new(),
      }),
    }
  }

  pub fn name(&self) -> &str {
    &self.shared.pool_name
  }

  pub fn is_running(&self) -> bool {
    self.shared.running.load(AtomicOrdering::Acquire)
  }

  pub fn task_count(&self) -> usize {
    self.shared.tasks.read().len()
  }

  /// Ids of every registered task, in registration order.
  pub fn task_ids(&self) -> Vec<TaskId> {
    self.shared.tasks.read().iter().map(|t| t.task_id.clone()).collect()
  }

  /// Number of awaited tasks launched but not yet finished.
  pub fn awaited_in_flight(&self) -> usize {
    self.shared.in_flight.count()
  }

  /// Registers `callable` with `args`.
  ///
  /// `callable` must hold a [`Function`](crate::Function) (see [`Value::func`]).
  /// If `awaited` is set, `run` does not return successfully until this task
  /// has finished.
  ///
  /// # Errors
  /// Returns `PoolError::InvalidCallable` for nil or non-callable values,
  /// `PoolError::ArityMismatch` if the argument count differs from the
  /// declared one, and `PoolError::TypeMismatch` or
  /// `PoolError::CapabilityNotSatisfied` for the first offending position.
  /// The pool is unchanged on error.
  ///
  /// Registering while the pool is running is not an error but the task is
  /// dropped: the returned id is never known to the pool.
  pub fn add_worker(&self, awaited: bool, callable: Value, args: Vec<Value>) -> Result<TaskId, PoolError> {
    let function = match callable.as_function() {
      Some(function) => function.clone(),
      None if callable.is_nil() => {
        return Err(PoolError::InvalidCallable("callable is nil".to_string()));
      }
      None => {
        return Err(PoolError::InvalidCallable(format!(
          "value of type `{}` is not callable",
          callable.type_name()
        )));
      }
    };
    function.check_args(&args)?;

    let seq = self.shared.id_seq.fetch_add(1, AtomicOrdering::Relaxed);
    let task_id = TaskId::generate(seq);

    if self.is_running() {
      warn!(pool_name = %self.shared.pool_name, %task_id, "AddWorker: Pool is running, task was not registered.");
      return Ok(task_id);
    }

    let task = Arc::new(Task::new(task_id.clone(), function, args, awaited));
    self.shared.tasks.write().push(task.clone());
    self.shared.task_index.insert(task_id.clone(), task);

    debug!(pool_name = %self.shared.pool_name, %task_id, awaited, "Registered task.");
    Ok(task_id)
  }

  /// Returns the values stored by the task's last completed invocation.
  ///
  /// The result is empty, not an error, if the task has not finished yet or
  /// if its invocation faulted.
  ///
  /// # Errors
  /// Returns `PoolError::TaskNotFound` if no task with `task_id` was
  /// registered in this pool.
  pub fn get_results(&self, task_id: impl AsRef<str>) -> Result<Vec<Value>, PoolError> {
    let task_id = task_id.as_ref();
    match self.shared.task_index.get(task_id) {
      Some(task) => Ok(task.results()),
      None => {
        trace!(pool_name = %self.shared.pool_name, %task_id, "GetResults: Unknown task id.");
        Err(PoolError::TaskNotFound(task_id.to_string()))
      }
    }
  }

  /// Launches every registered task and waits for the awaited ones.
  ///
  /// Returns `Ok(())` immediately if the pool is already running.
  ///
  /// # Errors
  /// Returns `PoolError::DeadlineExceeded` or `PoolError::Cancelled` when
  /// `ctx` fires before every awaited task has finished. Launched tasks are
  /// not stopped in that case; they finish in the background, still store
  /// their results, and the pool stays running until they do.
  pub async fn run(&self, ctx: &RunContext) -> Result<(), PoolError> {
    if self
      .shared
      .running
      .compare_exchange(false, true, AtomicOrdering::AcqRel, AtomicOrdering::Acquire)
      .is_err()
    {
      debug!(pool_name = %self.shared.pool_name, "Run: Pool is already running, ignoring.");
      return Ok(());
    }

    let tasks: Vec<Arc<Task>> = self.shared.tasks.read().clone();
    info!(pool_name = %self.shared.pool_name, task_count = tasks.len(), "Run: Launching tasks.");

    for task in tasks {
      let guard = task.awaited.then(|| self.shared.in_flight.add());
      let pool_name = self.shared.pool_name.clone();
      debug!(pool_name = %pool_name, task_id = %task.task_id, awaited = task.awaited, "Launching task.");
      // Every unit starts on its own thread; none may queue behind another.
      // The join handle is dropped; the unit reports only through its task and guard.
      let task_id = task.task_id.clone();
      let spawned = thread::Builder::new()
        .name(format!("pool-task-{task_id}"))
        .spawn(move || execute_task(&pool_name, &task, guard));
      if let Err(spawn_error) = spawned {
        // The closure, and with it the guard, is dropped here.
        error!(pool_name = %self.shared.pool_name, %task_id, "Failed to spawn thread for task: {}", spawn_error);
      }
    }

    let (done_tx, done_rx) = oneshot::channel::<()>();
    let coordinator_shared = self.shared.clone();
    self.shared.tokio_handle.spawn(
      async move {
        coordinator_shared.in_flight.wait().await;
        coordinator_shared.running.store(false, AtomicOrdering::Release);
        debug!(pool_name = %coordinator_shared.pool_name, "Coordinator: All awaited tasks finished.");
        if done_tx.send(()).is_err() {
          trace!(pool_name = %coordinator_shared.pool_name, "Coordinator: Run already returned, completion not delivered.");
        }
      }
      .instrument(info_span!("pool_coordinator", pool_name = %self.shared.pool_name)),
    );

    tokio::select! {
      biased;

      err = ctx.done() => {
        warn!(
          pool_name = %self.shared.pool_name,
          in_flight = self.shared.in_flight.count(),
          "Run: {} Launched tasks keep running in the background.",
          err
        );
        Err(err)
      }

      completion = done_rx => {
        if completion.is_err() {
          error!(pool_name = %self.shared.pool_name, "Run: Coordinator dropped without signalling completion.");
        }
        info!(pool_name = %self.shared.pool_name, "Run: All awaited tasks completed.");
        Ok(())
      }
    }
  }
}

impl fmt::Debug for WorkerPool {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("WorkerPool")
      .field("pool_name", &self.shared.pool_name)
      .field("task_count", &self.task_count())
      .field("running", &self.is_running())
      .field("awaited_in_flight", &self.awaited_in_flight())
      .finish_non_exhaustive()
  }
}

/// Invokes one task inside a failure boundary. Panics and argument
/// extraction errors are logged and leave the results untouched; the guard
/// is released on every path.
fn execute_task(pool_name: &str, task: &Task, guard: Option<WaitGuard>) {
  let span = info_span!("pool_task", pool_name = %pool_name, task_id = %task.task_id);
  let _entered = span.enter();

  match panic::catch_unwind(AssertUnwindSafe(|| task.function.call(&task.args))) {
    Ok(Ok(values)) => {
      trace!(returned = values.len(), "Task executed successfully.");
      task.store_results(values);
    }
    Ok(Err(invoke_error)) => {
      error!(fault = %invoke_error, "Task invocation failed, results left empty.");
    }
    Err(panic_payload) => {
      error!(fault = %panic_message(panic_payload.as_ref()), "Task panicked during execution, results left empty.");
    }
  }

  drop(guard);
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(s) = payload.downcast_ref::<&str>() {
    (*s).to_string()
  } else if let Some(s) = payload.downcast_ref::<String>() {
    s.clone()
  } else {
    "non-string panic payload".to_string()
  }
}
