//! Failure scenario tests
//!
//! These tests verify graceful degradation:
//! - Records without a key are dropped without affecting others
//! - Undecodable payloads are counted and skipped
//! - A stopped aggregator does not stop entity updates
//! - Broker outages are survived and recovered from
//! - A bounded buffer sheds the oldest records
//! - Replayed payloads survive control commands arriving mid-poll

use std::io::Write;
use std::time::Duration;

use sattrack::{
    ObjectClass, PipelineError, TelemetryRecord,
    actors::ingest::{IngestHandle, IngestSettings},
    broker::{self, BrokerSource, ReplayBroker},
    buffer::TelemetryBuffer,
    config::parse_config,
};

use crate::helpers::*;

#[tokio::test]
async fn test_keyless_record_is_dropped_alone() {
    let core = spawn_core();

    let keyless = TelemetryRecord {
        name: Some("NO KEY".to_string()),
        ..Default::default()
    };
    let result = core.router.route(keyless);
    assert!(matches!(result, Err(PipelineError::MalformedRecord(_))));

    core.router
        .route(create_record("1", Some("PAYLOAD"), Some("US")))
        .unwrap();
    settle(&core.registry).await;

    assert_eq!(core.registry.len(), 1);
    assert_eq!(core.aggregator.entities().await.unwrap().len(), 1);

    core.registry.shutdown_all().await;
    core.aggregator.shutdown().await;
}

#[tokio::test]
async fn test_bad_payloads_do_not_stop_ingestion() {
    let pipeline = spawn_pipeline(fast_settings());

    pipeline.publisher.publish("{ definitely not json").unwrap();
    pipeline
        .publisher
        .publish(r#"{"tleDataset": null}"#)
        .unwrap();
    pipeline
        .publisher
        .publish(r#"{"tleDataset": [{"catalogNumber": true}, {"catalogNumber": 9}]}"#)
        .unwrap();

    let stats = wait_for_ingest(&pipeline.ingest, |s| s.messages >= 3).await;
    assert_eq!(stats.decode_failures, 3);
    assert_eq!(stats.records_routed, 1);

    pipeline.ingest.shutdown().await.unwrap();
    assert_eq!(pipeline.aggregator.entities().await.unwrap().len(), 1);
    pipeline.aggregator.shutdown().await;
}

#[tokio::test]
async fn test_entity_updates_survive_aggregator_loss() {
    let core = spawn_core();
    core.aggregator.shutdown().await;

    let record = create_positioned_record("25544", 10.0, 20.0);
    core.router.route(record.clone()).unwrap();
    core.router.route(record).unwrap();

    let state = core.registry.get("25544").unwrap().state().await.unwrap();
    assert_eq!(state.history.len(), 2);
    assert!(state.last_update_millis.is_some());
    assert_eq!(state.latitude, Some(10.0));

    core.registry.shutdown_all().await;
}

#[tokio::test]
async fn test_broker_outage_and_recovery() {
    let pipeline = spawn_pipeline(fast_settings());

    pipeline.publisher.set_available(false);
    let stats = wait_for_ingest(&pipeline.ingest, |s| s.broker_errors >= 2).await;
    assert_eq!(stats.records_routed, 0);

    pipeline.publisher.set_available(true);
    pipeline.ingest.reconnect().await.unwrap();
    pipeline
        .publisher
        .publish(create_record_json(25544, "PAYLOAD", "ISS").to_string())
        .unwrap();

    wait_for_ingest(&pipeline.ingest, |s| s.records_routed == 1).await;

    pipeline.ingest.shutdown().await.unwrap();
    let types = pipeline.aggregator.type_counts().await.unwrap();
    assert_eq!(types[&ObjectClass::Payload].count, 1);
    pipeline.aggregator.shutdown().await;
}

#[tokio::test]
async fn test_ingest_without_reachable_broker_keeps_running() {
    let aggregator_core = spawn_core();
    let broker = ReplayBroker::new("/nonexistent/capture.ndjson".into(), 10);
    let ingest = IngestHandle::spawn(
        Box::new(broker),
        aggregator_core.registry.clone(),
        fast_settings(),
    );

    let stats = wait_for_ingest(&ingest, |s| s.broker_errors >= 3).await;
    assert_eq!(stats.polls, 0);
    assert!(ingest.reconnect().await.is_err());

    ingest.shutdown().await.unwrap();
    aggregator_core.aggregator.shutdown().await;
}

#[test]
fn test_bounded_buffer_sheds_oldest() {
    let buffer = TelemetryBuffer::bounded(3);

    for i in 0..5 {
        buffer.push(create_record(&i.to_string(), None, None));
    }

    let stats = buffer.stats();
    assert_eq!(stats.buffered, 3);
    assert_eq!(stats.evicted, 2);

    let keys: Vec<_> = buffer
        .drain_all()
        .into_iter()
        .map(|b| b.record.catalog_number.unwrap())
        .collect();
    assert_eq!(keys, vec!["2", "3", "4"]);
}

#[tokio::test]
async fn test_bounded_buffer_in_pipeline_routes_what_fits() {
    let pipeline = spawn_pipeline(IngestSettings {
        max_buffered: Some(2),
        ..fast_settings()
    });

    let dataset: Vec<_> = (1..=5)
        .map(|i| create_record_json(i, "DEBRIS", "US"))
        .collect();
    pipeline
        .publisher
        .publish(serde_json::json!({ "tleDataset": dataset }).to_string())
        .unwrap();

    let stats = wait_for_ingest(&pipeline.ingest, |s| s.messages >= 1).await;
    assert_eq!(stats.records_routed, 2);
    assert_eq!(stats.buffer.evicted, 3);
    assert_eq!(pipeline.registry.keys(), vec!["4", "5"]);

    pipeline.ingest.shutdown().await.unwrap();
    pipeline.aggregator.shutdown().await;
}

#[tokio::test]
async fn test_replay_source_from_config() {
    let mut capture = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        capture,
        "{}",
        serde_json::json!({ "tleDataset": [create_record_json(1, "PAYLOAD", "US")] })
    )
    .unwrap();
    writeln!(
        capture,
        "{}",
        serde_json::json!({ "tleDataset": [create_record_json(2, "DEBRIS", "FR")] })
    )
    .unwrap();

    let config = parse_config(&format!(
        r#"{{ "broker": {{ "poll_interval_ms": 10,
              "source": {{ "kind": "replay", "path": {:?} }} }} }}"#,
        capture.path().display().to_string()
    ))
    .unwrap();

    let source = broker::from_config(&config.broker).unwrap();
    assert!(source.describe().starts_with("replay of"));

    let core = spawn_core();
    let ingest = IngestHandle::spawn(source, core.registry.clone(), IngestSettings::from(&config));

    wait_for_ingest(&ingest, |s| s.records_routed >= 2).await;
    ingest.shutdown().await.unwrap();

    let countries = core.aggregator.country_counts().await.unwrap();
    assert_eq!(countries["US"].count, 1);
    assert_eq!(countries["FR"].count, 1);
    core.aggregator.shutdown().await;
}

#[tokio::test]
async fn test_replay_keeps_records_while_stats_are_queried() {
    const LINES: u32 = 3000;

    // several hundred bytes per line, so the capture spans many read buffers
    let mut capture = tempfile::NamedTempFile::new().unwrap();
    for n in 0..LINES {
        let mut record = create_record_json(n, "PAYLOAD", "US");
        record["name"] = serde_json::json!(format!("{n:>360}"));
        writeln!(capture, "{}", serde_json::json!({ "tleDataset": [record] })).unwrap();
    }
    capture.flush().unwrap();

    let core = spawn_core();
    let source = ReplayBroker::new(capture.path().to_path_buf(), 50);
    let ingest = IngestHandle::spawn(Box::new(source), core.registry.clone(), fast_settings());

    // Every query races an in-flight poll inside the ingest loop
    tokio::time::timeout(Duration::from_secs(10), async {
        while ingest.stats().await.unwrap().records_routed < LINES as u64 {}
    })
    .await
    .expect("replayed records went missing");

    let stats = ingest.shutdown().await.unwrap();
    assert_eq!(stats.messages, LINES as u64);
    assert_eq!(stats.records_routed, LINES as u64);
    assert_eq!(stats.entities, LINES as usize);
    assert_eq!(core.aggregator.entities().await.unwrap().len(), LINES as usize);

    core.aggregator.shutdown().await;
}

#[test]
fn test_missing_source_is_broker_unavailable() {
    let config = parse_config(r#"{ "broker": { "address": "kafka:9092", "topic": "tle" } }"#)
        .unwrap();

    match broker::from_config(&config.broker) {
        Err(PipelineError::BrokerUnavailable(msg)) => assert!(msg.contains("kafka:9092")),
        Err(other) => panic!("unexpected error {other}"),
        Ok(_) => panic!("expected no broker client"),
    }
}

#[tokio::test]
async fn test_replay_poll_after_close_fails() {
    let capture = tempfile::NamedTempFile::new().unwrap();
    let mut broker = ReplayBroker::new(capture.path().to_path_buf(), 1);

    broker.connect().await.unwrap();
    assert!(broker.poll(Duration::from_millis(1)).await.unwrap().is_empty());

    broker.close().await;
    assert!(broker.poll(Duration::from_millis(1)).await.is_err());
}
