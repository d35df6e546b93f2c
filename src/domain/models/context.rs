//! Per-call deadline and cancellation.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a call stopped before its work finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupted {
    DeadlineExceeded,
    Cancelled,
}

/// Deadline and cancellation signal carried by every counter operation.
///
/// Cloning shares the cancellation token, so cancelling any clone cancels
/// them all.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl CallContext {
    /// A context with no deadline that is never cancelled.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            cancel: CancellationToken::new(),
        }
    }

    /// Replace the cancellation token, e.g. with a child of a server-wide token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Whether the call can no longer make progress.
    pub fn interrupted(&self) -> Option<Interrupted> {
        if self.cancel.is_cancelled() {
            return Some(Interrupted::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Interrupted::DeadlineExceeded),
            _ => None,
        }
    }

    /// Drive `fut` until it completes, the deadline passes, or the context
    /// is cancelled. An interrupted future is dropped.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, Interrupted>
    where
        F: Future<Output = T>,
    {
        self.run_bounded(None, fut).await
    }

    /// Like [`run`](Self::run), additionally capped at `limit` from now.
    pub async fn run_bounded<F, T>(&self, limit: Option<Duration>, fut: F) -> Result<T, Interrupted>
    where
        F: Future<Output = T>,
    {
        let capped = limit.map(|limit| Instant::now() + limit);
        let deadline = match (self.deadline, capped) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };

        let bounded = async {
            match deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, fut)
                    .await
                    .map_err(|_| Interrupted::DeadlineExceeded),
                None => Ok(fut.await),
            }
        };

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(Interrupted::Cancelled),
            result = bounded => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_background_runs_to_completion() {
        let ctx = CallContext::background();
        assert_eq!(ctx.run(async { 7 }).await, Ok(7));
        assert!(ctx.deadline().is_none());
        assert!(ctx.interrupted().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_interrupts_slow_future() {
        let ctx = CallContext::with_timeout(Duration::from_millis(50));
        let result = ctx
            .run(tokio::time::sleep(Duration::from_secs(5)))
            .await;
        assert_eq!(result, Err(Interrupted::DeadlineExceeded));
        assert_eq!(ctx.interrupted(), Some(Interrupted::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_cancellation_interrupts() {
        let ctx = CallContext::background();
        ctx.cancellation_token().cancel();
        let result = ctx.run(std::future::pending::<()>()).await;
        assert_eq!(result, Err(Interrupted::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_bounded_uses_tighter_limit() {
        let ctx = CallContext::with_timeout(Duration::from_secs(60));
        let result = ctx
            .run_bounded(
                Some(Duration::from_millis(10)),
                tokio::time::sleep(Duration::from_secs(1)),
            )
            .await;
        assert_eq!(result, Err(Interrupted::DeadlineExceeded));
        assert!(ctx.interrupted().is_none());
    }

    #[tokio::test]
    async fn test_child_of_shared_token_is_cancelled_with_parent() {
        let server = CancellationToken::new();
        let ctx = CallContext::with_timeout(Duration::from_secs(1)).with_cancellation(server.child_token());
        assert!(ctx.interrupted().is_none());

        server.cancel();
        assert_eq!(ctx.interrupted(), Some(Interrupted::Cancelled));
        assert_eq!(ctx.run(async { 1 }).await, Err(Interrupted::Cancelled));
    }

    #[tokio::test]
    async fn test_clones_share_cancellation() {
        let ctx = CallContext::with_timeout(Duration::from_secs(1));
        let clone = ctx.clone();
        clone.cancellation_token().cancel();
        assert_eq!(ctx.interrupted(), Some(Interrupted::Cancelled));
    }
}
