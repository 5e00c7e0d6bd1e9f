//! Composition root for the tracking pipeline.
//!
//! ```text
//! raw sample ─► PositionManager ─► ReverseGeocoder ─► AddressCache
//!                    │                                   │
//!                    ▼                                   ▼
//!                 EventBus ◄──────────────────── field callbacks ─► Announcer ─► SpeechSink
//! ```
//!
//! [`TrackingPipeline`] owns one instance of each component. Nothing here is
//! global; tests build as many pipelines as they like and tear them down with
//! [`TrackingPipeline::destroy`].

mod config;
mod geocoder;
mod pipeline;
mod policy;

pub use config::{ConfigError, PipelineConfig};
pub use geocoder::{GeocodeError, ReverseGeocoder, ScriptedGeocoder};
pub use pipeline::{TrackOutcome, TrackingPipeline};
pub use policy::{AnnouncementPolicy, FieldPriority, PriorityTable, UpdateKind, DEFAULT_PRIORITY};
