use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// Counts awaited tasks still in flight.
#[derive(Debug, Default)]
pub(crate) struct WaitGroup {
  count: AtomicUsize,
  notify: Notify,
}

/// Decrements its [`WaitGroup`] exactly once, when dropped.
#[derive(Debug)]
pub(crate) struct WaitGuard {
  group: Arc<WaitGroup>,
}

impl WaitGroup {
  pub(crate) fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  /// Increments the counter and returns the guard that undoes it.
  pub(crate) fn add(self: &Arc<Self>) -> WaitGuard {
    self.count.fetch_add(1, Ordering::AcqRel);
    WaitGuard { group: self.clone() }
  }

  pub(crate) fn count(&self) -> usize {
    self.count.load(Ordering::Acquire)
  }

  /// Resolves once the counter is zero.
  pub(crate) async fn wait(&self) {
    loop {
      let notified = self.notify.notified();
      tokio::pin!(notified);
      // Register before checking so a concurrent final `done` is not missed.
      notified.as_mut().enable();
      if self.count() == 0 {
        return;
      }
      notified.await;
    }
  }

  fn done(&self) {
    if self.count.fetch_sub(1, Ordering::AcqRel) == 1 {
      self.notify.notify_waiters();
    }
  }
}

impl Drop for WaitGuard {
  fn drop(&mut self) {
    self.group.done();
  }
}
