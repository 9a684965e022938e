//! Cooperative cancellation for feed downloads.
//!
//! A [`CancelSignal`] can be shared across tasks (Ctrl+C handler, a
//! supervising task) and a [`DownloadContext`] bundles it with an optional
//! deadline. The downloader runs every request and every body read under the
//! context, so a cancelled or expired context ends the in-flight request.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

use crate::feed::{FeedError, FeedResult};

/// Shared handle to a cancel signal.
pub type SharedCancel = Arc<CancelSignal>;

/// One-shot cancellation flag with async notification.
#[derive(Debug, Default)]
pub struct CancelSignal {
    is_cancelled: AtomicBool,
    notify: Notify,
}

impl CancelSignal {
    /// Create a new signal.
    pub fn new() -> Self {
        Self {
            is_cancelled: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    /// Create a new shared signal wrapped in [`Arc`].
    pub fn shared() -> SharedCancel {
        Arc::new(Self::new())
    }

    /// Request cancellation. Notifies all waiters exactly once.
    pub fn cancel(&self) {
        if !self.is_cancelled.swap(true, Ordering::SeqCst) {
            self.notify.notify_waiters();
        }
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.is_cancelled.load(Ordering::SeqCst)
    }

    /// Wait until cancellation is requested. Returns immediately if already set.
    pub async fn cancelled(&self) {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        // Register before checking the flag so a concurrent cancel() is not missed
        notified.as_mut().enable();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}

/// Cancellation and deadline carried by one download call.
#[derive(Debug, Clone, Default)]
pub struct DownloadContext {
    cancel: Option<SharedCancel>,
    deadline: Option<Instant>,
}

impl DownloadContext {
    /// Context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// Attach a cancel signal.
    pub fn with_cancel(mut self, cancel: SharedCancel) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Set the deadline `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Set an absolute deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, if any.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Fail fast if the context is already done.
    pub fn check(&self) -> FeedResult<()> {
        if self.cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
            return Err(FeedError::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(FeedError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Drive `fut` to completion unless the context is cancelled or expires first.
    ///
    /// # Errors
    /// [`FeedError::Cancelled`] or [`FeedError::DeadlineExceeded`]; `fut` is dropped.
    pub async fn run<F: Future>(&self, fut: F) -> FeedResult<F::Output> {
        self.check()?;

        let cancelled = async {
            match &self.cancel {
                Some(cancel) => cancel.cancelled().await,
                None => std::future::pending().await,
            }
        };
        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancelled => Err(FeedError::Cancelled),
            _ = expired => Err(FeedError::DeadlineExceeded),
            output = fut => Ok(output),
        }
    }
}
