//! Notification plumbing shared by the tracking pipeline.
//!
//! Two layers live here:
//! - [`ObserverSubject`]: typed, in-process publish/subscribe used by the core
//!   components (position manager, address cache).
//! - [`EventBus`]: topic + JSON payload sink for the presentation layer, which
//!   only needs an event-kind string and a serialisable descriptor.

mod bus;
mod observer;

pub use bus::{emit_serialized, EmittedEvent, EventBus, EventBusRef, InMemoryEventBus, NullEventBus};
pub use observer::{CallbackError, Observer, ObserverSubject, SubscriptionId};

/// Event topics as constants to prevent typos.
pub mod event_names {
    /// A position sample was accepted and the tracking interval had elapsed.
    pub const POSITION_UPDATED: &str = "position:updated";
    /// A position sample was accepted before the tracking interval elapsed.
    pub const POSITION_UPDATED_IMMEDIATE: &str = "position:updated_immediate";
    /// A position sample was rejected by the accuracy or distance gate.
    pub const POSITION_REJECTED: &str = "position:rejected";
    /// A raw address payload was resolved to a new standardized address.
    pub const ADDRESS_UPDATED: &str = "address:updated";
    /// A tracked address field changed (logradouro, bairro, municipio).
    pub const ADDRESS_FIELD_CHANGED: &str = "address:field_changed";
    /// An announcement was handed to the speech output.
    pub const SPEECH_STARTED: &str = "speech:started";
}
