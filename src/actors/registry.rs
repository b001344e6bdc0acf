//! EntityRegistry - lazily created entity actors, keyed by catalog number
//!
//! Creation goes through a single path (`DashMap::entry`), which holds the
//! shard lock while the actor is spawned. Concurrent first sightings of the
//! same key therefore always end up with the same actor.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use futures::future::join_all;
use tracing::{debug, info};

use crate::records::CatalogNumber;

use super::aggregator::AggregatorHandle;
use super::entity::EntityHandle;

/// Map of live entity actors
#[derive(Clone)]
pub struct EntityRegistry {
    entities: Arc<DashMap<CatalogNumber, EntityHandle>>,
    aggregator: AggregatorHandle,
    base_address: Arc<str>,
    spawned: Arc<AtomicU64>,
}

impl EntityRegistry {
    pub fn new(aggregator: AggregatorHandle, base_address: &str) -> Self {
        Self {
            entities: Arc::new(DashMap::new()),
            aggregator,
            base_address: Arc::from(base_address.trim_end_matches('/')),
            spawned: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Command target for an entity
    pub fn address_of(&self, catalog_number: &str) -> String {
        format!("{}/satellite/{catalog_number}", self.base_address)
    }

    /// The actor for `catalog_number`, spawning it on first reference
    pub fn get_or_spawn(&self, catalog_number: &str) -> EntityHandle {
        if let Some(handle) = self.entities.get(catalog_number) {
            return handle.value().clone();
        }

        self.entities
            .entry(catalog_number.to_string())
            .or_insert_with(|| {
                let address = self.address_of(catalog_number);
                debug!("spawning entity actor {address}");
                self.spawned.fetch_add(1, Ordering::Relaxed);
                EntityHandle::spawn(
                    catalog_number.to_string(),
                    address,
                    self.aggregator.clone(),
                )
            })
            .value()
            .clone()
    }

    /// The actor for `catalog_number`, if it has been seen
    pub fn get(&self, catalog_number: &str) -> Option<EntityHandle> {
        self.entities.get(catalog_number).map(|h| h.value().clone())
    }

    /// Known catalog numbers, sorted
    pub fn keys(&self) -> Vec<CatalogNumber> {
        let mut keys: Vec<_> = self.entities.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Number of actors ever spawned
    pub fn spawned_total(&self) -> u64 {
        self.spawned.load(Ordering::Relaxed)
    }

    pub fn aggregator(&self) -> &AggregatorHandle {
        &self.aggregator
    }

    /// Stop every entity actor after its mailbox drains
    pub async fn shutdown_all(&self) {
        let handles: Vec<EntityHandle> = self.entities.iter().map(|e| e.value().clone()).collect();
        info!("stopping {} entity actors", handles.len());

        join_all(handles.iter().map(|handle| handle.shutdown())).await;
        debug!("all entity actors stopped");
    }
}
