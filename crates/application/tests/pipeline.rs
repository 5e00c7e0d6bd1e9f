//! Integration tests for the tracking pipeline.
//!
//! Drives the whole chain with a scripted geocoder, a recording speech sink
//! and an in-memory event bus.

use std::sync::{Arc, Mutex};

use guia_address::AddressField;
use guia_application::{
    FieldPriority, GeocodeError, PipelineConfig, PriorityTable, ScriptedGeocoder, TrackOutcome,
    TrackingPipeline, UpdateKind,
};
use guia_events::{event_names, InMemoryEventBus};
use guia_geo::{PositionError, RawPositionSample};
use guia_speech::{SpeechQueueItem, SpeechSink};
use guia_timing::ManualClock;
use serde_json::{json, Value};

const T0: i64 = 1_700_000_000_000;

#[derive(Default)]
struct RecordingSink {
    spoken: Mutex<Vec<String>>,
}

impl RecordingSink {
    fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

impl SpeechSink for RecordingSink {
    fn speak(&self, item: &SpeechQueueItem) -> anyhow::Result<()> {
        self.spoken.lock().unwrap().push(item.text().to_string());
        Ok(())
    }
}

struct Harness {
    pipeline: TrackingPipeline,
    geocoder: Arc<ScriptedGeocoder>,
    sink: Arc<RecordingSink>,
    bus: Arc<InMemoryEventBus>,
}

fn harness(config: PipelineConfig, payloads: Vec<Value>) -> Harness {
    let geocoder = Arc::new(ScriptedGeocoder::new(payloads));
    let sink = Arc::new(RecordingSink::default());
    let bus = Arc::new(InMemoryEventBus::new());
    let clock = Arc::new(ManualClock::new(T0));

    let pipeline = TrackingPipeline::new(config, clock, geocoder.clone(), sink.clone(), bus.clone());

    Harness {
        pipeline,
        geocoder,
        sink,
        bus,
    }
}

fn payload(road: &str, suburb: &str, city: &str) -> Value {
    json!({
        "address": {
            "road": road,
            "suburb": suburb,
            "city": city,
            "state": "Minas Gerais",
            "postcode": "39100-000",
            "country": "Brasil",
            "country_code": "br"
        }
    })
}

fn queued_texts(h: &Harness) -> Vec<String> {
    h.pipeline
        .announcer()
        .queued()
        .iter()
        .map(|i| i.text().to_string())
        .collect()
}

/// A sample roughly `step * 111` meters north of the start point.
fn sample(step: u32, offset_ms: i64) -> RawPositionSample {
    RawPositionSample::new(-18.2400 + f64::from(step) * 0.001, -43.6000, 8.0, T0 + offset_ms)
}

// =============================================================================
// Address announcements
// =============================================================================

mod announcements {
    use super::*;

    #[tokio::test]
    async fn test_first_address_is_not_announced() {
        let mut h = harness(
            PipelineConfig::default(),
            vec![payload("Rua da Glória", "Centro", "Diamantina")],
        );

        let outcome = h.pipeline.track(&sample(0, 0)).await;

        let TrackOutcome::Resolved { kind, resolution, .. } = outcome else {
            panic!("expected a resolved outcome, got {outcome:?}");
        };
        assert_eq!(kind, UpdateKind::Regular);
        assert_eq!(resolution.address.bairro.as_deref(), Some("Centro"));
        assert!(resolution.changes.is_empty());
        assert!(h.sink.spoken().is_empty());
    }

    #[tokio::test]
    async fn test_neighborhood_change_is_spoken_once() {
        let mut h = harness(
            PipelineConfig::default(),
            vec![
                payload("Rua da Glória", "Centro", "Diamantina"),
                payload("Rua do Bonfim", "Boa Vista", "Diamantina"),
                payload("Rua do Bonfim", "Boa Vista", "Diamantina"),
            ],
        );

        h.pipeline.track(&sample(0, 0)).await;
        h.pipeline.track(&sample(1, 60_000)).await;

        // Street change is queued first and starts immediately.
        assert_eq!(h.sink.spoken(), vec!["Você está na Rua do Bonfim"]);
        assert!(h.pipeline.announcer().is_speaking());

        h.pipeline.on_speech_finished();
        assert_eq!(
            h.sink.spoken(),
            vec!["Você está na Rua do Bonfim", "Você entrou no bairro Boa Vista"]
        );

        // Same payload again: cache hit, nothing new to say.
        h.pipeline.on_speech_finished();
        let outcome = h.pipeline.track(&sample(2, 120_000)).await;
        assert!(matches!(
            outcome,
            TrackOutcome::Resolved { ref resolution, .. } if resolution.cache_hit
        ));
        assert_eq!(h.sink.spoken().len(), 2);

        let changes = h.bus.events_for(event_names::ADDRESS_FIELD_CHANGED);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[1].payload["field"], "bairro");
        assert_eq!(changes[1].payload["from"], "Centro");
        assert_eq!(changes[1].payload["to"], "Boa Vista");
    }

    #[tokio::test]
    async fn test_default_priorities_keep_detection_order() {
        let mut h = harness(
            PipelineConfig::default(),
            vec![
                payload("Rua A", "Centro", "Serro"),
                payload("Rua B", "Centro", "Serro"),
                payload("Rua C", "Vila Nova", "Diamantina"),
            ],
        );

        h.pipeline.track(&sample(0, 0)).await;
        h.pipeline.track(&sample(1, 60_000)).await;
        // Still speaking "Rua B", so the next three changes wait.
        h.pipeline.track(&sample(2, 120_000)).await;

        assert_eq!(
            queued_texts(&h),
            vec![
                "Você está na Rua C",
                "Você entrou no bairro Vila Nova",
                "Você chegou em Diamantina",
            ]
        );
    }

    #[tokio::test]
    async fn test_configured_priorities_reorder_pending_announcements() {
        let config = PipelineConfig {
            priorities: PriorityTable::empty()
                .with(AddressField::Municipio, FieldPriority::flat(3))
                .with(AddressField::Bairro, FieldPriority::flat(2))
                .with(AddressField::Logradouro, FieldPriority::flat(1)),
            ..Default::default()
        };
        let mut h = harness(
            config,
            vec![
                payload("Rua A", "Centro", "Serro"),
                payload("Rua B", "Centro", "Serro"),
                payload("Rua C", "Vila Nova", "Diamantina"),
            ],
        );

        h.pipeline.track(&sample(0, 0)).await;
        h.pipeline.track(&sample(1, 60_000)).await;
        h.pipeline.track(&sample(2, 120_000)).await;

        assert_eq!(
            queued_texts(&h),
            vec![
                "Você chegou em Diamantina",
                "Você entrou no bairro Vila Nova",
                "Você está na Rua C",
            ]
        );
    }

    #[tokio::test]
    async fn test_immediate_updates_follow_policy_table() {
        let config = PipelineConfig {
            priorities: PriorityTable::empty().with(
                AddressField::Bairro,
                FieldPriority {
                    regular: Some(2),
                    immediate: None,
                },
            ),
            ..Default::default()
        };
        let mut h = harness(
            config,
            vec![
                payload("Rua A", "Centro", "Serro"),
                payload("Rua B", "Boa Vista", "Serro"),
            ],
        );

        h.pipeline.track(&sample(0, 0)).await;
        let outcome = h.pipeline.track(&sample(1, 5_000)).await;

        let TrackOutcome::Resolved { kind, resolution, .. } = outcome else {
            panic!("expected a resolved outcome, got {outcome:?}");
        };
        assert_eq!(kind, UpdateKind::Immediate);
        assert_eq!(resolution.changes.len(), 2);
        assert!(h.sink.spoken().is_empty());
        // Changes are still published even when silent.
        assert_eq!(h.bus.events_for(event_names::ADDRESS_FIELD_CHANGED).len(), 2);
    }
}

// =============================================================================
// Position gate
// =============================================================================

mod position_gate {
    use super::*;

    #[tokio::test]
    async fn test_inaccurate_sample_never_reaches_geocoder() {
        let mut h = harness(PipelineConfig::default(), vec![payload("Rua A", "Centro", "Serro")]);

        let bad = RawPositionSample::new(-18.24, -43.6, 350.0, T0);
        let outcome = h.pipeline.track(&bad).await;

        assert!(matches!(
            outcome,
            TrackOutcome::Rejected(PositionError::Accuracy { .. })
        ));
        assert_eq!(h.geocoder.remaining(), 1);

        let rejected = h.bus.last_for(event_names::POSITION_REJECTED).unwrap();
        assert_eq!(rejected.payload["error"]["type"], "accuracy");
        assert_eq!(rejected.payload["position"], Value::Null);
    }

    #[tokio::test]
    async fn test_jitter_is_rejected_by_distance() {
        let mut h = harness(PipelineConfig::default(), vec![payload("Rua A", "Centro", "Serro")]);

        h.pipeline.track(&sample(0, 0)).await;
        let nearby = RawPositionSample::new(-18.24005, -43.6, 8.0, T0 + 60_000);
        let outcome = h.pipeline.track(&nearby).await;

        assert!(matches!(
            outcome,
            TrackOutcome::Rejected(PositionError::Distance { .. })
        ));
    }

    #[tokio::test]
    async fn test_malformed_sample_is_dropped_silently() {
        let mut h = harness(PipelineConfig::default(), Vec::new());

        let mut malformed = sample(0, 0);
        malformed.timestamp = None;

        assert_eq!(h.pipeline.track(&malformed).await, TrackOutcome::Dropped);
        assert!(h.bus.is_empty());
    }

    #[tokio::test]
    async fn test_position_events_are_forwarded() {
        let mut h = harness(
            PipelineConfig::default(),
            vec![payload("Rua A", "Centro", "Serro"), payload("Rua B", "Centro", "Serro")],
        );

        h.pipeline.track(&sample(0, 0)).await;
        h.pipeline.track(&sample(1, 1_000)).await;

        assert_eq!(h.bus.events_for(event_names::POSITION_UPDATED).len(), 1);
        let immediate = h.bus.last_for(event_names::POSITION_UPDATED_IMMEDIATE).unwrap();
        assert_eq!(immediate.payload["kind"], "immediate");
        assert_eq!(h.bus.events_for(event_names::ADDRESS_UPDATED).len(), 2);
    }
}

// =============================================================================
// Failures and lifecycle
// =============================================================================

mod lifecycle {
    use super::*;

    #[tokio::test]
    async fn test_geocoder_failure_keeps_position() {
        let mut h = harness(PipelineConfig::default(), Vec::new());
        h.geocoder.push(Err(GeocodeError::Request("503".into())));

        let outcome = h.pipeline.track(&sample(0, 0)).await;

        assert!(matches!(
            outcome,
            TrackOutcome::Unresolved {
                error: GeocodeError::Request(_),
                ..
            }
        ));
        assert!(h.pipeline.positions().last_position().is_some());
        assert!(h.pipeline.addresses().current_address().is_none());
    }

    #[tokio::test]
    async fn test_speech_started_is_forwarded() {
        let mut h = harness(
            PipelineConfig::default(),
            vec![payload("Rua A", "Centro", "Serro"), payload("Rua B", "Centro", "Serro")],
        );

        h.pipeline.track(&sample(0, 0)).await;
        h.pipeline.track(&sample(1, 60_000)).await;

        let started = h.bus.last_for(event_names::SPEECH_STARTED).unwrap();
        assert_eq!(started.payload["text"], "Você está na Rua B");
        assert_eq!(started.payload["priority"], 1);
    }

    #[tokio::test]
    async fn test_cancel_speech_drops_queue() {
        let mut h = harness(
            PipelineConfig::default(),
            vec![payload("Rua A", "Centro", "Serro"), payload("Rua B", "Alto", "Diamantina")],
        );

        h.pipeline.track(&sample(0, 0)).await;
        h.pipeline.track(&sample(1, 60_000)).await;
        assert_eq!(h.pipeline.announcer().pending(), 2);

        h.pipeline.cancel_speech();

        assert_eq!(h.pipeline.announcer().pending(), 0);
        assert!(!h.pipeline.announcer().is_speaking());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_and_destroy_cycle() {
        for _ in 0..3 {
            let mut h = harness(PipelineConfig::default(), vec![payload("Rua A", "Centro", "Serro")]);
            h.pipeline.start();
            assert!(h.pipeline.addresses().is_sweeping());
            assert!(h.pipeline.announcer().has_backup_timer());

            h.pipeline.track(&sample(0, 0)).await;
            h.pipeline.destroy();

            assert!(!h.pipeline.addresses().is_sweeping());
            assert!(!h.pipeline.announcer().has_backup_timer());
            assert!(h.pipeline.positions().last_position().is_none());
            assert_eq!(h.pipeline.positions().subscriber_count(), 0);
            assert!(h.pipeline.addresses().is_empty());
        }
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = PipelineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(PipelineConfig::from_json_str(&json).unwrap(), config);
    }
}
