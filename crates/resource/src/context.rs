//! Request context for storage operations.
//!
//! This module defines [`RequestContext`], the cancellable scope every storage
//! operation runs in. A context carries a cancellation token, an optional
//! deadline and an optional correlation ID for tracing.
//!
//! Storage handlers wrap each store round-trip with [`RequestContext::run`], so
//! a request that is cancelled (or whose deadline passes) unwinds with a
//! cancellation error instead of waiting for, or reporting, the store result.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{CancellationError, StorageError, StorageResult};

/// A cancellable scope required for all storage operations.
///
/// Contexts are cheap to clone; clones share the same cancellation token, so
/// cancelling any clone cancels them all. A child context created with
/// [`child`](Self::child) is cancelled when its parent is, but cancelling the
/// child leaves the parent untouched.
///
/// ```
/// use rested_resource::RequestContext;
///
/// let ctx = RequestContext::new();
/// assert!(ctx.err().is_none());
///
/// ctx.cancel();
/// assert!(ctx.err().is_some());
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    token: CancellationToken,
    deadline: Option<Instant>,
    correlation_id: Option<String>,
}

impl RequestContext {
    /// Creates a context with no deadline that is never cancelled implicitly.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context bound to an existing cancellation token.
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            ..Default::default()
        }
    }

    /// Sets an absolute deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        });
        self
    }

    /// Sets a deadline relative to now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Creates a context with the specified correlation ID for tracing.
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Creates a child context that inherits cancellation and deadline.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
            correlation_id: self.correlation_id.clone(),
        }
    }

    /// Cancels this context and every context sharing or derived from its token.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns the cancellation token.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Returns the deadline, if set.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns the correlation ID, if set.
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    /// Returns why this context is done, or `None` while it is still live.
    pub fn err(&self) -> Option<CancellationError> {
        if self.token.is_cancelled() {
            return Some(CancellationError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                Some(CancellationError::DeadlineExceeded)
            }
            _ => None,
        }
    }

    /// Returns `Err` if this context is done.
    pub fn check(&self) -> StorageResult<()> {
        match self.err() {
            Some(reason) => Err(reason.into()),
            None => Ok(()),
        }
    }

    /// Waits until this context is cancelled or its deadline passes.
    pub async fn done(&self) -> CancellationError {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    _ = self.token.cancelled() => CancellationError::Cancelled,
                    _ = tokio::time::sleep_until(deadline) => CancellationError::DeadlineExceeded,
                }
            }
            None => {
                self.token.cancelled().await;
                CancellationError::Cancelled
            }
        }
    }

    /// Runs one store round-trip inside this context.
    ///
    /// Fails fast if the context is already done, abandons the future as soon
    /// as the context ends, and reports cancellation even when the future
    /// completed successfully but the context ended while it ran.
    pub async fn run<F, T>(&self, fut: F) -> StorageResult<T>
    where
        F: Future<Output = StorageResult<T>>,
    {
        self.check()?;
        let out = tokio::select! {
            biased;
            reason = self.done() => return Err(StorageError::Cancelled(reason)),
            out = fut => out,
        };
        self.check()?;
        out
    }
}
