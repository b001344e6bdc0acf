//! API shared state containing actor handles

use crate::actors::{aggregator::AggregatorHandle, ingest::IngestHandle, registry::EntityRegistry};

/// Shared state passed to all API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Fleet-wide indices and counts
    pub aggregator: AggregatorHandle,

    /// Entity actors, for per-entity state and history
    pub registry: EntityRegistry,

    /// Ingestion loop, when the API runs alongside one
    pub ingest: Option<IngestHandle>,
}

impl ApiState {
    pub fn new(registry: EntityRegistry, ingest: Option<IngestHandle>) -> Self {
        Self {
            aggregator: registry.aggregator().clone(),
            registry,
            ingest,
        }
    }
}
