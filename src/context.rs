use crate::error::PoolError;

use std::time::Duration;

use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

/// The deadline and cancellation signal bounding one `run` call.
///
/// Only the wait inside `run` observes it; callables already launched keep
/// running when it fires.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
  token: CancellationToken,
  deadline: Option<Instant>,
}

impl RunContext {
  /// No deadline, and a fresh token nobody else holds.
  pub fn background() -> Self {
    Self::default()
  }

  pub fn with_timeout(timeout: Duration) -> Self {
    Self::background().timeout(timeout)
  }

  pub fn with_deadline(deadline: Instant) -> Self {
    Self::background().deadline(deadline)
  }

  pub fn with_token(token: CancellationToken) -> Self {
    Self::background().token(token)
  }

  pub fn timeout(self, timeout: Duration) -> Self {
    self.deadline(Instant::now() + timeout)
  }

  pub fn deadline(mut self, deadline: Instant) -> Self {
    self.deadline = Some(deadline);
    self
  }

  pub fn token(mut self, token: CancellationToken) -> Self {
    self.token = token;
    self
  }

  pub fn cancellation_token(&self) -> &CancellationToken {
    &self.token
  }

  pub fn deadline_instant(&self) -> Option<Instant> {
    self.deadline
  }

  pub fn cancel(&self) {
    self.token.cancel();
  }

  /// Resolves with the error describing whichever signal fired first.
  /// Cancellation takes precedence when both are already fired.
  pub(crate) async fn done(&self) -> PoolError {
    tokio::select! {
      biased;
      _ = self.token.cancelled() => PoolError::Cancelled,
      _ = Self::deadline_elapsed(self.deadline) => PoolError::DeadlineExceeded,
    }
  }

  async fn deadline_elapsed(deadline: Option<Instant>) {
    match deadline {
      Some(deadline) => sleep_until(deadline).await,
      None => std::future::pending().await,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_deadline_fires() {
    let ctx = RunContext::with_timeout(Duration::from_millis(10));
    assert_eq!(ctx.done().await, PoolError::DeadlineExceeded);
  }

  #[tokio::test]
  async fn test_cancellation_wins_over_elapsed_deadline() {
    let ctx = RunContext::with_deadline(Instant::now());
    ctx.cancel();
    assert_eq!(ctx.done().await, PoolError::Cancelled);
  }

  #[tokio::test]
  async fn test_background_never_fires() {
    let ctx = RunContext::background();
    assert!(ctx.deadline_instant().is_none());
    let outcome = tokio::time::timeout(Duration::from_millis(30), ctx.done()).await;
    assert!(outcome.is_err());
  }

  #[tokio::test]
  async fn test_shared_token_cancels() {
    let token = CancellationToken::new();
    let ctx = RunContext::with_token(token.clone()).timeout(Duration::from_secs(60));
    token.cancel();
    assert!(ctx.cancellation_token().is_cancelled());
    assert_eq!(ctx.done().await, PoolError::Cancelled);
  }
}
