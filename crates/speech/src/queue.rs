use std::collections::VecDeque;

use guia_timing::ClockRef;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of pending announcements.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// How long an announcement stays relevant, in milliseconds.
pub const DEFAULT_ITEM_TTL_MS: i64 = 30_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpeechQueueError {
    #[error("announcement text is empty")]
    EmptyText,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechQueueConfig {
    pub capacity: usize,
    pub ttl_ms: i64,
}

impl Default for SpeechQueueConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_QUEUE_CAPACITY,
            ttl_ms: DEFAULT_ITEM_TTL_MS,
        }
    }
}

/// One pending announcement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpeechQueueItem {
    text: String,
    priority: i32,
    created_at_ms: i64,
}

impl SpeechQueueItem {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn created_at_ms(&self) -> i64 {
        self.created_at_ms
    }

    pub fn is_expired(&self, now_ms: i64, ttl_ms: i64) -> bool {
        now_ms.saturating_sub(self.created_at_ms) > ttl_ms
    }
}

/// Announcements ordered by descending priority, FIFO among equals.
///
/// Stale items are never returned: every read sweeps expired items first.
pub struct SpeechQueue {
    items: VecDeque<SpeechQueueItem>,
    config: SpeechQueueConfig,
    clock: ClockRef,
}

impl SpeechQueue {
    pub fn new(config: SpeechQueueConfig, clock: ClockRef) -> Self {
        let config = SpeechQueueConfig {
            capacity: config.capacity.max(1),
            ..config
        };
        Self {
            items: VecDeque::with_capacity(config.capacity),
            config,
            clock,
        }
    }

    pub fn config(&self) -> &SpeechQueueConfig {
        &self.config
    }

    /// Queue `text` behind every item of equal or higher priority.
    ///
    /// When the queue overflows, the lowest-priority items are dropped from
    /// the tail, which may include the one just added.
    pub fn enqueue(&mut self, text: impl Into<String>, priority: i32) -> Result<(), SpeechQueueError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(SpeechQueueError::EmptyText);
        }

        self.sweep_expired();

        let item = SpeechQueueItem {
            text,
            priority,
            created_at_ms: self.clock.now_ms(),
        };
        let position = self
            .items
            .iter()
            .position(|queued| queued.priority < priority)
            .unwrap_or(self.items.len());
        self.items.insert(position, item);

        while self.items.len() > self.config.capacity {
            if let Some(dropped) = self.items.pop_back() {
                tracing::debug!(priority = dropped.priority, text = %dropped.text, "speech queue full, dropped lowest priority");
            }
        }

        tracing::debug!(priority, position, size = self.items.len(), "announcement queued");
        Ok(())
    }

    /// Remove and return the highest-priority live item.
    pub fn dequeue(&mut self) -> Option<SpeechQueueItem> {
        self.sweep_expired();
        self.items.pop_front()
    }

    /// The item [`dequeue`](Self::dequeue) would return.
    pub fn peek(&mut self) -> Option<&SpeechQueueItem> {
        self.sweep_expired();
        self.items.front()
    }

    pub fn size(&mut self) -> usize {
        self.sweep_expired();
        self.items.len()
    }

    pub fn is_empty(&mut self) -> bool {
        self.size() == 0
    }

    /// Snapshot of live items in dequeue order.
    pub fn items(&self) -> Vec<SpeechQueueItem> {
        let now = self.clock.now_ms();
        self.items
            .iter()
            .filter(|item| !item.is_expired(now, self.config.ttl_ms))
            .cloned()
            .collect()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    fn sweep_expired(&mut self) {
        let now = self.clock.now_ms();
        let ttl = self.config.ttl_ms;
        let before = self.items.len();
        self.items.retain(|item| !item.is_expired(now, ttl));

        let dropped = before - self.items.len();
        if dropped > 0 {
            tracing::debug!(dropped, "expired announcements dropped");
        }
    }
}

impl std::fmt::Debug for SpeechQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechQueue")
            .field("config", &self.config)
            .field("queued", &self.items.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guia_timing::ManualClock;
    use std::sync::Arc;

    fn queue(capacity: usize) -> (SpeechQueue, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000));
        let config = SpeechQueueConfig {
            capacity,
            ..Default::default()
        };
        (SpeechQueue::new(config, clock.clone()), clock)
    }

    fn texts(queue: &SpeechQueue) -> Vec<String> {
        queue.items().iter().map(|i| i.text().to_string()).collect()
    }

    #[test]
    fn test_priority_order_is_stable() {
        let (mut q, _clock) = queue(10);
        q.enqueue("first five", 5).unwrap();
        q.enqueue("one", 1).unwrap();
        q.enqueue("second five", 5).unwrap();

        assert_eq!(q.dequeue().unwrap().text(), "first five");
        assert_eq!(q.dequeue().unwrap().text(), "second five");
        assert_eq!(q.dequeue().unwrap().text(), "one");
        assert!(q.dequeue().is_none());
    }

    #[test]
    fn test_rejects_blank_text() {
        let (mut q, _clock) = queue(10);
        assert_eq!(q.enqueue("", 1), Err(SpeechQueueError::EmptyText));
        assert_eq!(q.enqueue("   ", 1), Err(SpeechQueueError::EmptyText));
        assert!(q.is_empty());
    }

    #[test]
    fn test_overflow_drops_lowest_tail() {
        let (mut q, _clock) = queue(2);
        q.enqueue("low", 1).unwrap();
        q.enqueue("high", 9).unwrap();
        q.enqueue("mid", 5).unwrap();

        assert_eq!(texts(&q), vec!["high", "mid"]);

        // Lowest newcomer into a full queue is the one dropped.
        q.enqueue("lower", 0).unwrap();
        assert_eq!(texts(&q), vec!["high", "mid"]);
    }

    #[test]
    fn test_expired_items_are_invisible() {
        let (mut q, clock) = queue(10);
        q.enqueue("stale", 9).unwrap();
        clock.advance(20_000);
        q.enqueue("fresh", 1).unwrap();
        clock.advance(10_001);

        assert_eq!(q.size(), 1);
        assert!(!q.is_empty());
        assert_eq!(q.peek().map(SpeechQueueItem::text), Some("fresh"));
        assert_eq!(q.dequeue().unwrap().text(), "fresh");
        assert!(q.is_empty());
    }

    #[test]
    fn test_item_at_exact_ttl_is_live() {
        let (mut q, clock) = queue(10);
        q.enqueue("edge", 1).unwrap();
        clock.advance(DEFAULT_ITEM_TTL_MS);
        assert_eq!(q.size(), 1);
    }

    #[test]
    fn test_clock_jump_expires_without_overflow() {
        let (mut q, clock) = queue(10);
        clock.set(i64::MIN);
        q.enqueue("ancient", 1).unwrap();

        clock.set(i64::MAX);
        assert!(q.is_empty());
    }

    #[test]
    fn test_clear_and_zero_capacity() {
        let (mut q, _clock) = queue(0);
        assert_eq!(q.config().capacity, 1);
        q.enqueue("a", 1).unwrap();
        q.enqueue("b", 2).unwrap();
        assert_eq!(texts(&q), vec!["b"]);

        q.clear();
        assert!(q.is_empty());
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: SpeechQueueConfig = serde_json::from_str(r#"{"ttl_ms": 5000}"#).unwrap();
        assert_eq!(config.capacity, DEFAULT_QUEUE_CAPACITY);
        assert_eq!(config.ttl_ms, 5_000);
    }
}
