//! API response types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::actors::messages::{AggregatorStats, IngestStats};
use crate::fleet::{NamedCount, ObjectClass};
use crate::records::{CatalogNumber, EntitySummary, TrackPoint};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SatellitesResponse {
    pub count: usize,
    pub satellites: Vec<EntitySummary>,
}

/// Ground track of one entity, oldest point first
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TracksResponse {
    pub catalog_number: CatalogNumber,
    pub last_update: Option<i64>,
    pub history: Vec<TrackPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassResponse {
    pub class: ObjectClass,
    pub display_name: String,
    pub count: usize,
    pub members: Vec<EntitySummary>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RegistryStats {
    /// Entity actors currently registered
    pub live_actors: usize,

    /// Entity actors spawned since start
    pub spawned_total: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineStatsResponse {
    pub timestamp: String,
    pub aggregator: AggregatorStats,
    pub registry: RegistryStats,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingest: Option<IngestStats>,
}

/// Counts keyed by bucket name, as returned by the stats endpoints
pub type CountsResponse = BTreeMap<String, NamedCount>;
