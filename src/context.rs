use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a [`Context`] stopped a piece of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("context cancelled")]
    Cancelled,
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Cancellable request context passed to provisioning, queries and hooks.
///
/// A context carries a cancellation token and an optional deadline. Children
/// derived with [`with_cancel`](Context::with_cancel) or
/// [`with_timeout`](Context::with_timeout) are cancelled together with their
/// parent, but cancelling a child leaves the parent untouched.
///
/// ```rust
/// use std::time::Duration;
/// use sql_registry::prelude::*;
///
/// # async fn demo() -> Result<(), ContextError> {
/// let ctx = Context::background().with_timeout(Duration::from_secs(5));
/// let answer = ctx.run(async { 42 }).await?;
/// assert_eq!(answer, 42);
/// # Ok(()) }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    #[must_use]
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a child that can be cancelled on its own.
    #[must_use]
    pub fn with_cancel(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Derive a child whose deadline is `timeout` from now (or the parent's, if earlier).
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derive a child with the given deadline (or the parent's, if earlier).
    #[must_use]
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(parent) if parent < deadline => parent,
            _ => deadline,
        };
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// True once the context is cancelled or its deadline has passed.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.check().is_err()
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    #[must_use]
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.token
    }

    /// Report whether the context is still live.
    ///
    /// # Errors
    /// Returns the reason the context is done.
    pub fn check(&self) -> Result<(), ContextError> {
        if self.token.is_cancelled() {
            return Err(ContextError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(ContextError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Drive `fut` to completion unless the context is cancelled or times out first.
    ///
    /// The future is dropped as soon as the context finishes, so anything it
    /// owns (a half-opened connection, a pool checkout) is released.
    ///
    /// # Errors
    /// Returns [`ContextError`] if the context was done before or during the call.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, ContextError>
    where
        F: Future,
    {
        self.check()?;
        let expiry = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(ContextError::Cancelled),
            () = expiry => Err(ContextError::DeadlineExceeded),
            out = fut => Ok(out),
        }
    }
}
