//! Helper functions for integration tests

#![allow(dead_code)]

use std::time::Duration;

use sattrack::{
    TelemetryRecord,
    actors::{
        aggregator::AggregatorHandle,
        ingest::{IngestHandle, IngestSettings},
        messages::IngestStats,
        registry::EntityRegistry,
        router::Router,
    },
    broker::{ChannelPublisher, channel::channel},
};

pub const BASE_ADDRESS: &str = "warp://localhost:9001";

pub fn create_record(
    catalog_number: &str,
    object_type: Option<&str>,
    country_code: Option<&str>,
) -> TelemetryRecord {
    TelemetryRecord {
        catalog_number: Some(catalog_number.to_string()),
        name: Some(format!("OBJECT {catalog_number}")),
        object_type: object_type.map(str::to_string),
        country_code: country_code.map(str::to_string),
        ..Default::default()
    }
}

pub fn create_positioned_record(catalog_number: &str, lat: f64, lng: f64) -> TelemetryRecord {
    TelemetryRecord {
        latitude: Some(lat),
        longitude: Some(lng),
        ..create_record(catalog_number, Some("PAYLOAD"), Some("US"))
    }
}

pub fn create_record_json(catalog_number: u32, object_type: &str, country: &str) -> serde_json::Value {
    serde_json::json!({
        "catalogNumber": catalog_number,
        "name": format!("OBJECT {catalog_number}"),
        "type": object_type,
        "countryCode": country,
        "latitude": 51.6,
        "longitude": -0.1,
        "tle": [
            "1 25544U 98067A   24001.00000000  .00016717  00000-0  10270-3 0  9005",
            "2 25544  51.6400 208.9163 0006317  69.9862  25.2906 15.50000000    07"
        ]
    })
}

pub struct Core {
    pub aggregator: AggregatorHandle,
    pub registry: EntityRegistry,
    pub router: Router,
}

/// Aggregator, registry and router without a broker in front
pub fn spawn_core() -> Core {
    let aggregator = AggregatorHandle::spawn(format!("{BASE_ADDRESS}/aggregation"));
    let registry = EntityRegistry::new(aggregator.clone(), BASE_ADDRESS);
    let router = Router::new(registry.clone());

    Core {
        aggregator,
        registry,
        router,
    }
}

pub struct Pipeline {
    pub publisher: ChannelPublisher,
    pub ingest: IngestHandle,
    pub aggregator: AggregatorHandle,
    pub registry: EntityRegistry,
}

/// Full pipeline fed through an in-process broker
pub fn spawn_pipeline(settings: IngestSettings) -> Pipeline {
    let (publisher, broker) = channel();
    let aggregator = AggregatorHandle::spawn(format!("{BASE_ADDRESS}/aggregation"));
    let registry = EntityRegistry::new(aggregator.clone(), BASE_ADDRESS);
    let ingest = IngestHandle::spawn(Box::new(broker), registry.clone(), settings);

    Pipeline {
        publisher,
        ingest,
        aggregator,
        registry,
    }
}

pub fn fast_settings() -> IngestSettings {
    IngestSettings {
        poll_interval: Duration::from_millis(10),
        ..Default::default()
    }
}

/// Wait until every entity actor has worked through its mailbox.
///
/// Summaries they forwarded are queued at the aggregator before any query
/// sent after this returns.
pub async fn settle(registry: &EntityRegistry) {
    for key in registry.keys() {
        if let Some(entity) = registry.get(&key) {
            entity.state().await.unwrap();
        }
    }
}

/// Poll ingest stats until `done` holds (5s timeout)
pub async fn wait_for_ingest(
    ingest: &IngestHandle,
    done: impl Fn(&IngestStats) -> bool,
) -> IngestStats {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let stats = ingest.stats().await.unwrap();
            if done(&stats) {
                return stats;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("ingest did not reach the expected state in time")
}
