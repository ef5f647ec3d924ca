//! Cancellable deadline context for a single request.
//!
//! A [`RequestContext`] is done once its [`CancellationToken`] is cancelled or
//! its deadline (if any) has passed. Waiting code races its work against
//! [`RequestContext::done`]; the context itself never stops any task.

use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct RequestContext {
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::background()
    }
}

impl RequestContext {
    /// A context with no deadline that is only done when cancelled.
    pub fn background() -> Self {
        Self {
            deadline: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            cancel: CancellationToken::new(),
        }
    }

    /// Attaches an externally owned token, e.g. one cancelled on client disconnect.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns a guard that cancels this context when dropped.
    pub fn drop_guard(&self) -> tokio_util::sync::DropGuard {
        self.cancel.clone().drop_guard()
    }

    pub fn is_done(&self) -> bool {
        self.cancel.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Resolves once the context is cancelled or its deadline elapses.
    pub async fn done(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.cancel.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.cancel.cancelled().await,
        }
    }
}
