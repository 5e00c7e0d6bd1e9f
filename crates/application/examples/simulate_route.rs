//! Example: walk a short route through Serro and print what would be spoken.
//!
//! Run with: cargo run -p guia-application --example simulate_route

use std::sync::Arc;

use guia_application::{PipelineConfig, ScriptedGeocoder, TrackOutcome, TrackingPipeline};
use guia_events::EventBus;
use guia_geo::RawPositionSample;
use guia_speech::{SpeechQueueItem, SpeechSink};
use guia_timing::SystemClock;
use serde_json::json;
use tracing_subscriber::EnvFilter;

struct ConsoleSink;

impl SpeechSink for ConsoleSink {
    fn speak(&self, item: &SpeechQueueItem) -> anyhow::Result<()> {
        println!("speak [{}] {}", item.priority(), item.text());
        Ok(())
    }
}

struct LogBus;

impl EventBus for LogBus {
    fn emit(&self, topic: &str, payload: serde_json::Value) {
        tracing::info!(topic, %payload, "event");
    }
}

fn address(road: &str, number: &str, suburb: &str, town: &str) -> serde_json::Value {
    json!({
        "address": {
            "road": road,
            "house_number": number,
            "suburb": suburb,
            "town": town,
            "state": "Minas Gerais",
            "ISO3166-2-lvl4": "BR-MG",
            "postcode": "39150-000",
            "country": "Brasil",
            "country_code": "br"
        }
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,guia=debug")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };

    let geocoder = Arc::new(ScriptedGeocoder::new([
        address("Rua Direita", "172", "Milho Verde", "Serro"),
        address("Rua Direita", "190", "Milho Verde", "Serro"),
        address("Rua do Rosário", "15", "Centro", "Serro"),
        address("Praça João Pinheiro", "1", "Centro", "Serro"),
    ]));

    let mut pipeline = TrackingPipeline::new(
        config,
        Arc::new(SystemClock),
        geocoder,
        Arc::new(ConsoleSink),
        Arc::new(LogBus),
    );
    pipeline.start();

    let route = [
        (-18.4696091, -43.4953982, 8.0),
        (-18.4698000, -43.4951000, 250.0),
        (-18.4699500, -43.4949000, 12.0),
        (-18.4712000, -43.4932000, 9.0),
        (-18.4725000, -43.4917000, 6.0),
    ];

    let start_ms = chrono::Utc::now().timestamp_millis();
    for (i, (lat, lon, accuracy)) in route.into_iter().enumerate() {
        let sample = RawPositionSample::new(lat, lon, accuracy, start_ms + i as i64 * 60_000);
        match pipeline.track(&sample).await {
            TrackOutcome::Resolved { resolution, kind, .. } => {
                println!("{:?}: {}", kind, resolution.address);
            }
            TrackOutcome::Rejected(error) => println!("rejected: {error}"),
            TrackOutcome::Unresolved { error, .. } => println!("unresolved: {error}"),
            TrackOutcome::Dropped => println!("dropped"),
        }
        pipeline.on_speech_finished();
    }

    pipeline.destroy();
    Ok(())
}
