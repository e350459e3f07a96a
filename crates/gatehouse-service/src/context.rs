//! Per-operation context carrying cancellation and an optional deadline.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;

/// Passed first to every [`crate::RbacService`] operation.
///
/// When the token is cancelled or the deadline passes, the operation
/// returns `Cancelled` and its in-flight future is dropped. Dropping an
/// uncommitted transaction rolls it back.
#[derive(Debug, Clone, Default)]
pub struct OpContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl OpContext {
    /// A context that never cancels on its own.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tie the context to an existing cancellation token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Give up after `timeout` from now.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    /// Give up at `deadline`.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// The token observed by [`Self::run`].
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Drive `fut` to completion unless the context is cancelled first.
    pub async fn run<T, F>(&self, fut: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        if self.cancel.is_cancelled() {
            return Err(AppError::cancelled("Operation cancelled"));
        }

        let deadline = async {
            match self.deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(AppError::cancelled("Operation cancelled")),
            _ = deadline => Err(AppError::cancelled("Operation deadline elapsed")),
            result = fut => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use gatehouse_core::ErrorKind;

    use super::*;

    #[tokio::test]
    async fn test_completes_when_untouched() {
        let ctx = OpContext::new();
        assert_eq!(ctx.run(async { Ok(5) }).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_pre_cancelled_context_short_circuits() {
        let ctx = OpContext::new();
        ctx.cancellation_token().cancel();
        let err = ctx.run(async { Ok(()) }).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_interrupts_slow_work() {
        let ctx = OpContext::new().with_timeout(Duration::from_millis(50));
        let err = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_mid_flight() {
        let ctx = OpContext::new();
        let token = ctx.cancellation_token().clone();
        let (result, _) = tokio::join!(
            ctx.run(std::future::pending::<AppResult<()>>()),
            async move { token.cancel() }
        );
        assert_eq!(result.unwrap_err().kind, ErrorKind::Cancelled);
    }
}
