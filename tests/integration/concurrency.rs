//! Concurrency and race condition tests
//!
//! These tests verify:
//! - Concurrent first sightings spawn exactly one actor per key
//! - Per-entity update order survives concurrent routing
//! - Fleet counts stay consistent under load
//! - The buffer loses nothing when pushes race a drain

use std::collections::HashSet;

use sattrack::{ObjectClass, actors::router::Router, buffer::TelemetryBuffer};

use crate::helpers::*;

const KEYS: usize = 200;
const UPDATES_PER_KEY: usize = 5;
const ROUTERS: usize = 10;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_keys_routed_concurrently() {
    let core = spawn_core();

    // Each router task owns a disjoint slice of keys and sends its updates in
    // sequence order, so per-key order is well defined.
    let mut tasks = vec![];
    for task_id in 0..ROUTERS {
        let router = Router::new(core.registry.clone());
        tasks.push(tokio::spawn(async move {
            for seq in 0..UPDATES_PER_KEY {
                for key in (task_id..KEYS).step_by(ROUTERS) {
                    let class = match key % 3 {
                        0 => "PAYLOAD",
                        1 => "DEBRIS",
                        _ => "ROCKET BODY",
                    };
                    let mut record = create_record(&key.to_string(), Some(class), None);
                    record.latitude = Some(seq as f64);
                    router.route(record).unwrap();
                }
                tokio::task::yield_now().await;
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    settle(&core.registry).await;

    assert_eq!(core.registry.len(), KEYS);
    assert_eq!(core.registry.spawned_total(), KEYS as u64);

    for key in core.registry.keys() {
        let state = core.registry.get(&key).unwrap().state().await.unwrap();
        let lats: Vec<f64> = state.history.iter().map(|p| p.lat).collect();
        let expected: Vec<f64> = (0..UPDATES_PER_KEY).map(|seq| seq as f64).collect();
        assert_eq!(lats, expected, "history out of order for {key}");
    }

    let types = core.aggregator.type_counts().await.unwrap();
    let total: usize = types.values().map(|c| c.count).sum();
    assert_eq!(total, KEYS);
    assert_eq!(types[&ObjectClass::Payload].count, 67);
    assert_eq!(types[&ObjectClass::Debris].count, 67);
    assert_eq!(types[&ObjectClass::RocketBody].count, 66);

    let countries = core.aggregator.country_counts().await.unwrap();
    assert_eq!(countries["Unknown"].count, KEYS);

    let stats = core.aggregator.stats().await.unwrap();
    assert_eq!(stats.summaries_applied, (KEYS * UPDATES_PER_KEY) as u64);
    assert_eq!(stats.first_sightings, KEYS as u64);
    assert_eq!(stats.backlog, 0);

    core.registry.shutdown_all().await;
    core.aggregator.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_key_first_sighted_from_many_tasks() {
    let core = spawn_core();

    let tasks: Vec<_> = (0..32)
        .map(|_| {
            let router = Router::new(core.registry.clone());
            tokio::spawn(async move {
                router
                    .route(create_record("25544", Some("PAYLOAD"), Some("ISS")))
                    .unwrap();
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    settle(&core.registry).await;

    assert_eq!(core.registry.spawned_total(), 1);
    let state = core.registry.get("25544").unwrap().state().await.unwrap();
    assert_eq!(state.history.len(), 32);

    let types = core.aggregator.type_counts().await.unwrap();
    assert_eq!(types[&ObjectClass::Payload].count, 1);

    core.registry.shutdown_all().await;
    core.aggregator.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_queries_during_updates() {
    let core = spawn_core();

    let writer = {
        let router = core.router.clone();
        tokio::spawn(async move {
            for i in 0..500 {
                router
                    .route(create_record(&(i % 50).to_string(), Some("DEBRIS"), Some("US")))
                    .unwrap();
            }
        })
    };

    let mut readers = vec![];
    for _ in 0..5 {
        let aggregator = core.aggregator.clone();
        readers.push(tokio::spawn(async move {
            for _ in 0..20 {
                let types = aggregator.type_counts().await.unwrap();
                let countries = aggregator.country_counts().await.unwrap();
                // Both views come from the same single-threaded owner
                assert!(types[&ObjectClass::Debris].count <= 50);
                assert!(countries.get("US").map_or(0, |c| c.count) <= 50);
            }
        }));
    }

    writer.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }

    settle(&core.registry).await;
    let types = core.aggregator.type_counts().await.unwrap();
    assert_eq!(types[&ObjectClass::Debris].count, 50);

    core.registry.shutdown_all().await;
    core.aggregator.shutdown().await;
}

#[test]
fn test_buffer_push_races_drain() {
    let buffer = TelemetryBuffer::unbounded();

    let producers: Vec<_> = (0..4)
        .map(|p| {
            let buffer = buffer.clone();
            std::thread::spawn(move || {
                for i in 0..1000 {
                    buffer.push(create_record(&format!("{p}-{i}"), None, None));
                }
            })
        })
        .collect();

    let mut seen = HashSet::new();
    let mut last_key = None;
    while producers.iter().any(|p| !p.is_finished()) || !buffer.is_empty() {
        for buffered in buffer.drain_all() {
            assert!(last_key < Some(buffered.key), "drain out of arrival order");
            last_key = Some(buffered.key);
            assert!(seen.insert(buffered.record.catalog_number.unwrap()));
        }
    }
    for producer in producers {
        producer.join().unwrap();
    }
    for buffered in buffer.drain_all() {
        assert!(seen.insert(buffered.record.catalog_number.unwrap()));
    }

    assert_eq!(seen.len(), 4000);
    assert_eq!(buffer.stats().total_pushed, 4000);
}
