//! Tracked fire-and-forget work.
//!
//! Work that must not hold up a response (mail after commit) runs here.
//! A task's error or panic is logged and never reaches the request.
//! Shutdown waits for whatever is still in flight.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, warn};

use crate::Result;

/// Tracker for background tasks.
#[derive(Debug, Clone, Default)]
pub struct BackgroundTasks {
    tracker: TaskTracker,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` in the background under `name`.
    pub fn spawn<F>(&self, name: &'static str, task: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        self.tracker.spawn(async move {
            match AssertUnwindSafe(task).catch_unwind().await {
                Ok(Ok(())) => debug!(task = name, "background task finished"),
                Ok(Err(e)) => error!(task = name, error = %e, "background task failed"),
                Err(_) => error!(task = name, "background task panicked"),
            }
        });
    }

    /// Number of tasks still running.
    pub fn len(&self) -> usize {
        self.tracker.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracker.is_empty()
    }

    /// Wait for every task spawned so far, then accept new ones again.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Close the tracker and wait up to `timeout` for in-flight tasks.
    /// Returns false if some were still running.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.tracker.close();
        if tokio::time::timeout(timeout, self.tracker.wait()).await.is_err() {
            warn!(
                remaining = self.tracker.len(),
                "background tasks still running at shutdown"
            );
            return false;
        }
        true
    }
}
