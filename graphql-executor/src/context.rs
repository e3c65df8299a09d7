//! Request-scoped cancellation and deadline.

use std::time::Duration;

use displaydoc::Display;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a [`Context`] is done.
#[derive(Error, Display, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextError {
    /// context canceled
    Cancelled,
    /// context deadline exceeded
    DeadlineExceeded,
}

/// Carries cancellation, an optional deadline and the current tracing span
/// down the execution tree.
///
/// Cloning is cheap. Derived contexts are cancelled with their parent, never
/// the other way around.
#[derive(Clone, Debug)]
pub struct Context {
    cancellation: CancellationToken,
    deadline: Option<Instant>,
    span: tracing::Span,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            cancellation: CancellationToken::new(),
            deadline: None,
            span: tracing::Span::current(),
        }
    }
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// A derived context that can be cancelled on its own.
    pub fn child(&self) -> Self {
        Self {
            cancellation: self.cancellation.child_token(),
            deadline: self.deadline,
            span: self.span.clone(),
        }
    }

    /// A derived context that times out after `timeout`, or earlier if this one does.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// A derived context that times out at `deadline`, or earlier if this one does.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let mut child = self.child();
        child.deadline = Some(match self.deadline {
            Some(current) if current < deadline => current,
            _ => deadline,
        });
        child
    }

    pub(crate) fn with_span(&self, span: tracing::Span) -> Self {
        Self {
            cancellation: self.cancellation.clone(),
            deadline: self.deadline,
            span,
        }
    }

    pub fn span(&self) -> &tracing::Span {
        &self.span
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancels this context and every context derived from it.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Returns why the context is done, or `None` while it is still live.
    pub fn err(&self) -> Option<ContextError> {
        if matches!(self.deadline, Some(deadline) if deadline <= Instant::now()) {
            Some(ContextError::DeadlineExceeded)
        } else if self.cancellation.is_cancelled() {
            Some(ContextError::Cancelled)
        } else {
            None
        }
    }

    /// Completes once the context is cancelled or its deadline has passed.
    pub async fn done(&self) -> ContextError {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.cancellation.cancelled() => {
                        self.err().unwrap_or(ContextError::Cancelled)
                    }
                    _ = tokio::time::sleep_until(deadline) => ContextError::DeadlineExceeded,
                }
            }
            None => {
                self.cancellation.cancelled().await;
                ContextError::Cancelled
            }
        }
    }
}
