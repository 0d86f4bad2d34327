//! Cancellable scheduled tasks.
//!
//! Every timer the client owns (reconnect delay, online settle delay,
//! background monitor, environment subscription) is a [`ScheduledTask`].
//! Dropping the handle aborts the task, so replacing or clearing the handle
//! is the only bookkeeping needed.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Owning handle to a spawned task. Aborts the task on drop.
#[derive(Debug)]
pub struct ScheduledTask {
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    /// Spawn `fut` immediately.
    pub fn spawn<F>(fut: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            handle: tokio::spawn(fut),
        }
    }

    /// Spawn a task that waits `delay` and then runs `fut` as a detached task.
    ///
    /// Only the wait is owned by the handle: once the delay has elapsed the
    /// fired work is no longer affected by dropping the handle, so the fired
    /// work may itself replace the handle.
    pub fn after<F>(delay: Duration, fut: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self::spawn(async move {
            tokio::time::sleep(delay).await;
            tokio::spawn(fut);
        })
    }

    /// True until the task has finished or been cancelled.
    pub fn is_pending(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Abort the task now.
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending_delay() {
        let fired = Arc::new(AtomicU32::new(0));
        let f = fired.clone();
        let task = ScheduledTask::after(Duration::from_secs(1), async move {
            f.fetch_add(1, Ordering::SeqCst);
        });
        assert!(task.is_pending());
        task.cancel();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_delay() {
        let fired = Arc::new(AtomicU32::new(0));
        let f = fired.clone();
        let task = ScheduledTask::after(Duration::from_secs(1), async move {
            f.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!task.is_pending());
    }
}
