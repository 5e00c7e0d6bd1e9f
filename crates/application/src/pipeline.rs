//! The tracking pipeline: position gate, geocoder, address cache, speech.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use guia_address::{AddressCache, AddressChange, Resolution};
use guia_events::{emit_serialized, event_names, EventBusRef};
use guia_geo::{GeoPosition, PositionError, PositionManager, RawPositionSample};
use guia_speech::{Announcer, SpeechQueue, SpeechSink};
use guia_timing::ClockRef;

use crate::config::PipelineConfig;
use crate::geocoder::{GeocodeError, ReverseGeocoder};
use crate::policy::{AnnouncementPolicy, UpdateKind};

/// What happened to one raw sample.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackOutcome {
    /// Malformed sample, dropped with no event.
    Dropped,
    /// Rejected by a position gate.
    Rejected(PositionError),
    /// Accepted, but the geocoder had nothing for it.
    Unresolved {
        position: GeoPosition,
        kind: UpdateKind,
        error: GeocodeError,
    },
    /// Accepted and resolved to an address.
    Resolved {
        position: GeoPosition,
        kind: UpdateKind,
        resolution: Resolution,
    },
}

/// Owns one instance of every component and wires them together.
///
/// Notifications flow to the [`guia_events::EventBus`]; tracked address
/// changes are turned into announcements by the [`AnnouncementPolicy`].
pub struct TrackingPipeline {
    positions: PositionManager,
    addresses: AddressCache,
    announcer: Arc<Announcer>,
    geocoder: Arc<dyn ReverseGeocoder>,
    /// Kind of the update currently being resolved, read by field callbacks.
    immediate: Arc<AtomicBool>,
}

impl TrackingPipeline {
    pub fn new(
        config: PipelineConfig,
        clock: ClockRef,
        geocoder: Arc<dyn ReverseGeocoder>,
        sink: Arc<dyn SpeechSink>,
        bus: EventBusRef,
    ) -> Self {
        let policy: Arc<dyn AnnouncementPolicy> = Arc::new(config.priorities.clone());
        Self::with_policy(config, clock, geocoder, sink, bus, policy)
    }

    /// Build with a custom announcement policy instead of the configured table.
    pub fn with_policy(
        config: PipelineConfig,
        clock: ClockRef,
        geocoder: Arc<dyn ReverseGeocoder>,
        sink: Arc<dyn SpeechSink>,
        bus: EventBusRef,
        policy: Arc<dyn AnnouncementPolicy>,
    ) -> Self {
        let PipelineConfig {
            position,
            address_cache,
            speech_queue,
            announcer,
            ..
        } = config;

        let queue = SpeechQueue::new(speech_queue, Arc::clone(&clock));
        let announcer = Arc::new(Announcer::new(queue, sink, announcer, Arc::clone(&clock)));
        let immediate = Arc::new(AtomicBool::new(false));

        let mut positions = PositionManager::new(position);
        let position_bus = Arc::clone(&bus);
        positions.subscribe_fn(move |event| {
            emit_serialized(&*position_bus, event.kind.topic(), event);
            Ok(())
        });

        let tracked_fields = address_cache.tracked_fields.clone();
        let mut addresses = AddressCache::new(address_cache, clock);
        let address_bus = Arc::clone(&bus);
        addresses.subscribe_fn(move |event| {
            emit_serialized(&*address_bus, event_names::ADDRESS_UPDATED, event);
            Ok(())
        });

        for field in tracked_fields {
            let bus = Arc::clone(&bus);
            let policy = Arc::clone(&policy);
            let announcer = Arc::clone(&announcer);
            let immediate = Arc::clone(&immediate);
            addresses.on_field_change(field, move |change: &AddressChange| {
                emit_serialized(&*bus, event_names::ADDRESS_FIELD_CHANGED, change);

                let kind = if immediate.load(Ordering::Acquire) {
                    UpdateKind::Immediate
                } else {
                    UpdateKind::Regular
                };
                let Some(priority) = policy.priority(change.field, kind) else {
                    return Ok(());
                };
                let Some(text) = policy.text(change) else {
                    return Ok(());
                };
                announcer.announce(text, priority)?;
                Ok(())
            });
        }

        let speech_bus = Arc::clone(&bus);
        announcer.subscribe_started(move |item| {
            emit_serialized(&*speech_bus, event_names::SPEECH_STARTED, item);
            Ok(())
        });

        Self {
            positions,
            addresses,
            announcer,
            geocoder,
            immediate,
        }
    }

    /// Start the background timers. Must be called inside a tokio runtime.
    pub fn start(&mut self) {
        self.addresses.start_expiry_sweep();
        self.announcer.start_backup_timer();
        tracing::info!("tracking pipeline started");
    }

    /// Feed one raw sample through the whole pipeline.
    pub async fn track(&mut self, sample: &RawPositionSample) -> TrackOutcome {
        let Some(event) = self.positions.update(sample) else {
            return TrackOutcome::Dropped;
        };

        let (Some(kind), Some(position)) = (UpdateKind::from_event_kind(event.kind), event.position)
        else {
            return match event.error {
                Some(error) => TrackOutcome::Rejected(error),
                None => TrackOutcome::Dropped,
            };
        };

        let raw = match self
            .geocoder
            .reverse(position.latitude(), position.longitude())
            .await
        {
            Ok(raw) => raw,
            Err(error) => {
                tracing::warn!(error = %error, position = %position, "reverse geocoding failed");
                return TrackOutcome::Unresolved {
                    position,
                    kind,
                    error,
                };
            }
        };

        self.immediate
            .store(kind == UpdateKind::Immediate, Ordering::Release);
        let resolution = self.addresses.resolve_detailed(&raw);

        TrackOutcome::Resolved {
            position,
            kind,
            resolution,
        }
    }

    /// Completion signal from the speech output.
    pub fn on_speech_finished(&self) {
        self.announcer.on_speech_finished();
    }

    /// Silence the current announcement and drop the pending ones.
    pub fn cancel_speech(&self) {
        self.announcer.cancel();
    }

    pub fn positions(&self) -> &PositionManager {
        &self.positions
    }

    pub fn addresses(&self) -> &AddressCache {
        &self.addresses
    }

    pub fn announcer(&self) -> &Announcer {
        &self.announcer
    }

    /// Stop every timer and release all state.
    pub fn destroy(&mut self) {
        self.positions.destroy();
        self.addresses.destroy();
        self.announcer.destroy();
        tracing::info!("tracking pipeline destroyed");
    }
}

impl std::fmt::Debug for TrackingPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackingPipeline")
            .field("positions", &self.positions)
            .field("addresses", &self.addresses)
            .field("announcer", &self.announcer)
            .finish()
    }
}
