//! Drives a [`SpeechQueue`] into a speech output.
//!
//! Two triggers feed the same drain step: the sink reporting completion
//! through [`Announcer::on_speech_finished`], and a backup timer for outputs
//! whose completion signal gets lost. A busy flag makes the drain idempotent,
//! so overlapping triggers never speak two items at once.
//!
//! Each backup tick first releases a stale busy flag: the sink reports that it
//! is idle or, for sinks that cannot tell, the current item has held the
//! output for longer than [`AnnouncerConfig::max_speech_ms`].

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use guia_events::{ObserverSubject, SubscriptionId};
use guia_timing::{ClockRef, PeriodicTask};
use serde::{Deserialize, Serialize};

use crate::queue::{SpeechQueue, SpeechQueueError, SpeechQueueItem};

/// Backup drain interval, in milliseconds.
pub const DEFAULT_BACKUP_INTERVAL_MS: u64 = 1_000;

/// Longest an item may hold the output without a completion signal.
pub const DEFAULT_MAX_SPEECH_MS: i64 = 15_000;

/// `speaking_since_ms` while an item is being handed to the sink.
const HANDING_OVER: i64 = i64::MAX;

/// Speech output engine.
pub trait SpeechSink: Send + Sync {
    /// Start speaking `item`. Completion is reported back through
    /// [`Announcer::on_speech_finished`].
    fn speak(&self, item: &SpeechQueueItem) -> anyhow::Result<()>;

    /// Stop whatever is being spoken.
    fn cancel(&self) {}

    /// Whether the output is still busy, or `None` if it cannot tell.
    fn is_speaking(&self) -> Option<bool> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnouncerConfig {
    pub backup_interval_ms: u64,
    pub max_speech_ms: i64,
}

impl Default for AnnouncerConfig {
    fn default() -> Self {
        Self {
            backup_interval_ms: DEFAULT_BACKUP_INTERVAL_MS,
            max_speech_ms: DEFAULT_MAX_SPEECH_MS,
        }
    }
}

struct Shared {
    queue: Mutex<SpeechQueue>,
    sink: Arc<dyn SpeechSink>,
    /// Set while an item is with the sink.
    speaking: AtomicBool,
    speaking_since_ms: AtomicI64,
    max_speech_ms: i64,
    clock: ClockRef,
    started: Mutex<ObserverSubject<SpeechQueueItem>>,
}

impl Shared {
    fn process(&self) -> Option<SpeechQueueItem> {
        if self
            .speaking
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }
        self.speaking_since_ms.store(HANDING_OVER, Ordering::Release);

        let Some(item) = lock(&self.queue).dequeue() else {
            self.speaking.store(false, Ordering::Release);
            return None;
        };

        if let Err(e) = self.sink.speak(&item) {
            tracing::warn!(error = %e, text = %item.text(), "speech output failed");
            self.speaking.store(false, Ordering::Release);
            return None;
        }

        self.speaking_since_ms.store(self.clock.now_ms(), Ordering::Release);
        tracing::debug!(priority = item.priority(), text = %item.text(), "speaking");
        lock(&self.started).notify(&item);
        Some(item)
    }

    /// Clear the busy flag when the completion signal for the current item
    /// never arrived. Returns whether it was cleared.
    fn release_stale(&self) -> bool {
        if !self.speaking.load(Ordering::Acquire) {
            return false;
        }
        let since = self.speaking_since_ms.load(Ordering::Acquire);
        if since == HANDING_OVER {
            return false;
        }

        // A sink that can report its state is trusted over the deadline.
        let reported = self.sink.is_speaking();
        let stale = match reported {
            Some(busy) => !busy,
            None => self.clock.now_ms().saturating_sub(since) > self.max_speech_ms,
        };
        if !stale {
            return false;
        }

        let released = self
            .speaking
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if released {
            tracing::warn!(?reported, "speech completion not reported, releasing output");
        }
        released
    }

    fn backup_tick(&self) -> Option<SpeechQueueItem> {
        self.release_stale();
        self.process()
    }
}

/// Feeds queued announcements to a [`SpeechSink`] one at a time.
pub struct Announcer {
    shared: Arc<Shared>,
    config: AnnouncerConfig,
    backup: Mutex<Option<PeriodicTask>>,
}

impl Announcer {
    pub fn new(
        queue: SpeechQueue,
        sink: Arc<dyn SpeechSink>,
        config: AnnouncerConfig,
        clock: ClockRef,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                queue: Mutex::new(queue),
                sink,
                speaking: AtomicBool::new(false),
                speaking_since_ms: AtomicI64::new(0),
                max_speech_ms: config.max_speech_ms,
                clock,
                started: Mutex::new(ObserverSubject::new("speech_started")),
            }),
            config,
            backup: Mutex::new(None),
        }
    }

    /// Queue an announcement and try to start speaking.
    pub fn announce(&self, text: impl Into<String>, priority: i32) -> Result<(), SpeechQueueError> {
        lock(&self.shared.queue).enqueue(text, priority)?;
        self.process();
        Ok(())
    }

    /// Hand the next item to the sink unless something is already playing.
    ///
    /// Returns the item that started, if any.
    pub fn process(&self) -> Option<SpeechQueueItem> {
        self.shared.process()
    }

    /// Completion trigger: release the busy flag and move to the next item.
    pub fn on_speech_finished(&self) -> Option<SpeechQueueItem> {
        self.shared.speaking.store(false, Ordering::Release);
        self.process()
    }

    /// Backup trigger: release a stale busy flag, then drain.
    pub fn backup_tick(&self) -> Option<SpeechQueueItem> {
        self.shared.backup_tick()
    }

    pub fn is_speaking(&self) -> bool {
        self.shared.speaking.load(Ordering::Acquire)
    }

    pub fn pending(&self) -> usize {
        lock(&self.shared.queue).size()
    }

    /// Snapshot of queued items in speaking order.
    pub fn queued(&self) -> Vec<SpeechQueueItem> {
        lock(&self.shared.queue).items()
    }

    /// Observe items as they are handed to the sink, from either trigger.
    pub fn subscribe_started<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&SpeechQueueItem) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        lock(&self.shared.started).subscribe_fn(callback)
    }

    pub fn unsubscribe_started(&self, id: SubscriptionId) -> bool {
        lock(&self.shared.started).unsubscribe(id)
    }

    /// Start the backup drain timer. Must be called inside a tokio runtime.
    pub fn start_backup_timer(&self) {
        let shared = Arc::clone(&self.shared);
        let interval = Duration::from_millis(self.config.backup_interval_ms.max(1));
        let task = PeriodicTask::spawn("speech_backup_drain", interval, move || {
            shared.backup_tick();
        });
        *lock(&self.backup) = Some(task);
    }

    pub fn stop_backup_timer(&self) {
        if let Some(task) = lock(&self.backup).take() {
            task.cancel();
        }
    }

    pub fn has_backup_timer(&self) -> bool {
        lock(&self.backup).as_ref().is_some_and(PeriodicTask::is_running)
    }

    /// Drop every pending item and silence the sink.
    pub fn cancel(&self) {
        lock(&self.shared.queue).clear();
        self.shared.sink.cancel();
        self.shared.speaking.store(false, Ordering::Release);
        tracing::debug!("announcements cancelled");
    }

    /// Stop the timer, cancel speech and drop observers.
    pub fn destroy(&self) {
        self.stop_backup_timer();
        self.cancel();
        lock(&self.shared.started).clear();
        tracing::info!("announcer destroyed");
    }
}

impl std::fmt::Debug for Announcer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Announcer")
            .field("config", &self.config)
            .field("speaking", &self.is_speaking())
            .field("backup_timer", &self.has_backup_timer())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
