use std::time::Duration;
use tokio::runtime::Handle;
use tracing::info;
use worker_orchestra::{RunContext, TaskId, Value, WorkerPool};

#[derive(Clone, Debug)]
struct User {
  id: u32,
  name: String,
}

fn my_task_fn(id: usize, delay_ms: u64) -> String {
  info!("Task {} starting, will sleep for {}ms", id, delay_ms);
  std::thread::sleep(Duration::from_millis(delay_ms));
  let result = format!("Task {} finished successfully after {}ms", id, delay_ms);
  info!("{}", result);
  result
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_target(false) // Disable module paths for cleaner example output
    .init();

  info!("--- Basic Usage Example ---");

  let pool = WorkerPool::new(Handle::current(), "basic_pool");
  let mut ids: Vec<TaskId> = Vec::new();

  for i in 0..5usize {
    // Alternate sleep times for variety
    let sleep_duration: u64 = 500 + (i as u64 % 3 * 250);
    match pool.add_worker(
      true,
      Value::func(my_task_fn),
      vec![Value::new(i), Value::new(sleep_duration)],
    ) {
      Ok(id) => {
        info!("Registered task {} with id {}", i, id);
        ids.push(id);
      }
      Err(e) => tracing::error!("Failed to register task {}: {}", i, e),
    }
  }

  let user_id = pool
    .add_worker(
      false,
      Value::func(|u: User| format!("{} ({})", u.name, u.id)),
      vec![Value::new(User { id: 10, name: "pepe".to_string() })],
    )
    .expect("Failed to register user task");

  info!("All tasks registered. Running pool...");
  if let Err(e) = pool.run(&RunContext::with_timeout(Duration::from_secs(10))).await {
    tracing::error!("Run did not complete: {}", e);
    return;
  }

  for id in ids.iter().chain(std::iter::once(&user_id)) {
    match pool.get_results(id) {
      Ok(results) if results.is_empty() => info!("Task {} has not finished yet", id),
      Ok(results) => match results[0].downcast_ref::<String>() {
        Some(text) => info!("Result for task {}: {}", id, text),
        None => info!("Result for task {}: {:?}", id, results[0]),
      },
      Err(e) => info!("Error for task {}: {}", id, e),
    }
  }

  info!("--- Basic Usage Example End ---");
}
