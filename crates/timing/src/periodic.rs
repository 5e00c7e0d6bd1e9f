//! Cancellable periodic task.
//!
//! Runs a closure on a fixed interval inside the current tokio runtime until
//! cancelled. Cancellation is synchronous from the caller's point of view: once
//! [`PeriodicTask::cancel`] returns, the closure will not be invoked again.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Handle to a background interval task.
///
/// Dropping the handle cancels the task.
pub struct PeriodicTask {
    name: &'static str,
    cancel_token: CancellationToken,
    running: Arc<AtomicBool>,
}

impl PeriodicTask {
    /// Spawn `tick` every `interval` on the current tokio runtime.
    ///
    /// The first invocation happens one full interval after spawning.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime, like `tokio::spawn`.
    pub fn spawn<F>(name: &'static str, interval: Duration, mut tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let cancel_token = CancellationToken::new();
        let child = cancel_token.child_token();
        let running = Arc::new(AtomicBool::new(true));
        let running_flag = Arc::clone(&running);

        tokio::spawn(async move {
            tracing::info!(task = name, interval_ms = interval.as_millis() as u64, "periodic task started");

            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = child.cancelled() => break,
                    _ = ticker.tick() => {
                        // Re-check after waking: cancel() may have raced the tick.
                        if child.is_cancelled() {
                            break;
                        }
                        tick();
                    }
                }
            }

            running_flag.store(false, Ordering::Release);
            tracing::info!(task = name, "periodic task stopped");
        });

        Self {
            name,
            cancel_token,
            running,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Stop the task. Idempotent.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
        self.running.store(false, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for PeriodicTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeriodicTask")
            .field("name", &self.name)
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    async fn let_task_run() {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_on_interval() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);

        let task = PeriodicTask::spawn("test", Duration::from_secs(60), move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        let_task_run().await;
        assert_eq!(count.load(Ordering::SeqCst), 0, "No tick before first interval");

        tokio::time::advance(Duration::from_secs(60)).await;
        let_task_run().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(60)).await;
        let_task_run().await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        assert!(task.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_ticks() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);

        let task = PeriodicTask::spawn("test", Duration::from_secs(1), move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        task.cancel();
        assert!(!task.is_running());

        tokio::time::advance(Duration::from_secs(10)).await;
        let_task_run().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        // Second cancel is a no-op.
        task.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);

        {
            let _task = PeriodicTask::spawn("test", Duration::from_secs(1), move || {
                count_clone.fetch_add(1, Ordering::SeqCst);
            });
        }

        tokio::time::advance(Duration::from_secs(5)).await;
        let_task_run().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
