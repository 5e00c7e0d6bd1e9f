//! Spoken announcements.
//!
//! [`SpeechQueue`] holds short texts ordered by priority with a freshness
//! limit; [`Announcer`] drains it into a [`SpeechSink`] one item at a time.

mod announcer;
mod queue;

pub use announcer::{
    Announcer, AnnouncerConfig, SpeechSink, DEFAULT_BACKUP_INTERVAL_MS, DEFAULT_MAX_SPEECH_MS,
};
pub use queue::{
    SpeechQueue, SpeechQueueConfig, SpeechQueueError, SpeechQueueItem, DEFAULT_ITEM_TTL_MS,
    DEFAULT_QUEUE_CAPACITY,
};
