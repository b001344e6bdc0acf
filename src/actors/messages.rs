//! Message types for actor communication
//!
//! ## Design Principles
//!
//! 1. **Commands**: Addressed to one actor through its mailbox (mpsc)
//! 2. **Events**: Broadcast notifications for passive subscribers
//! 3. **Immutability**: Actors only ever exchange owned copies of records and
//!    summaries, never references into each other's state

use std::collections::BTreeMap;

use serde::Serialize;
use tokio::sync::oneshot;

use crate::buffer::BufferStats;
use crate::error::PipelineResult;
use crate::fleet::{NamedCount, ObjectClass};
use crate::records::{CatalogNumber, EntitySummary, TelemetryRecord};
use crate::tracking::EntityState;

/// Commands that can be sent to an EntityActor
#[derive(Debug)]
pub enum EntityCommand {
    /// Apply a decoded record to the entity
    Update { record: TelemetryRecord },

    /// Get a copy of the entity's current state and history
    GetState {
        respond_to: oneshot::Sender<EntityState>,
    },

    /// Stop after every update already in the mailbox has been applied
    Shutdown { respond_to: oneshot::Sender<()> },
}

/// Commands that can be sent to the Aggregator
#[derive(Debug)]
pub enum AggregatorCommand {
    /// Add a first-seen entity or refresh a known one
    AddOrUpdateEntity { summary: EntitySummary },

    /// Get the current summary of one entity
    GetEntity {
        catalog_number: CatalogNumber,
        respond_to: oneshot::Sender<Option<EntitySummary>>,
    },

    /// Get every entity summary
    GetEntities {
        respond_to: oneshot::Sender<Vec<EntitySummary>>,
    },

    /// Get the summaries of all entities first classified as `class`
    GetMembers {
        class: ObjectClass,
        respond_to: oneshot::Sender<Vec<EntitySummary>>,
    },

    /// Get the per-type counts
    GetTypeCounts {
        respond_to: oneshot::Sender<BTreeMap<ObjectClass, NamedCount>>,
    },

    /// Get the per-country counts
    GetCountryCounts {
        respond_to: oneshot::Sender<BTreeMap<String, NamedCount>>,
    },

    /// Get throughput statistics
    GetStats {
        respond_to: oneshot::Sender<AggregatorStats>,
    },

    /// Stop after every summary already in the mailbox has been applied
    Shutdown { respond_to: oneshot::Sender<()> },
}

/// Aggregator throughput statistics
///
/// Every entity update funnels through the aggregator, so `backlog` and
/// `peak_backlog` are the numbers to watch when the pipeline falls behind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AggregatorStats {
    /// Summaries applied since start
    pub summaries_applied: u64,

    /// Summaries that were the first sighting of their entity
    pub first_sightings: u64,

    /// Distinct entities known
    pub entities: usize,

    /// Summaries currently queued in the mailbox
    pub backlog: usize,

    /// Largest backlog observed
    pub peak_backlog: usize,
}

/// Event published by the aggregator after each applied summary
///
/// Slow subscribers may lag and miss events; the aggregator never waits for them.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FleetEvent {
    /// First sighting of an entity
    EntityAdded {
        summary: EntitySummary,
        class: ObjectClass,
    },

    /// Refresh of a known entity
    EntityUpdated { summary: EntitySummary },
}

impl FleetEvent {
    pub fn summary(&self) -> &EntitySummary {
        match self {
            FleetEvent::EntityAdded { summary, .. } | FleetEvent::EntityUpdated { summary } => {
                summary
            }
        }
    }
}

/// Commands that can be sent to the IngestActor
#[derive(Debug)]
pub enum IngestCommand {
    /// Run one poll/drain/route cycle immediately
    ///
    /// Responds with the number of records routed.
    PollNow {
        respond_to: oneshot::Sender<PipelineResult<usize>>,
    },

    /// Close and re-open the broker connection
    Reconnect {
        respond_to: oneshot::Sender<PipelineResult<()>>,
    },

    /// Get ingestion statistics
    GetStats {
        respond_to: oneshot::Sender<IngestStats>,
    },

    /// Stop polling, route what is buffered, release the broker and stop
    /// every entity actor once its mailbox is empty
    Shutdown {
        respond_to: oneshot::Sender<IngestStats>,
    },
}

/// Ingestion statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    /// Poll cycles run
    pub polls: u64,

    /// Raw payloads received from the broker
    pub messages: u64,

    /// Payloads (or payload items) that failed to decode
    pub decode_failures: u64,

    /// Records dropped by the router (no key, or undeliverable)
    pub records_dropped: u64,

    /// Records handed to entity actors
    pub records_routed: u64,

    /// Failed broker operations
    pub broker_errors: u64,

    /// Buffer counters at the time of the query
    pub buffer: BufferStats,

    /// Entity actors spawned so far
    pub entities: usize,
}
