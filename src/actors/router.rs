//! Router - hands each drained record to the actor of its entity
//!
//! The router holds no per-entity state of its own. It extracts the catalog
//! number, asks the registry for the matching actor (spawning it on first
//! sight) and queues the record in that actor's mailbox. Records without a key
//! are dropped; nothing is retried.

use tracing::{debug, trace, warn};

use crate::buffer::BufferedRecord;
use crate::error::{PipelineError, PipelineResult};
use crate::records::TelemetryRecord;

use super::registry::EntityRegistry;

/// Outcome of routing one drained batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteReport {
    /// Records queued at their entity actor
    pub routed: usize,

    /// Records without a key
    pub malformed: usize,

    /// Records whose entity actor could not be reached
    pub undeliverable: usize,
}

impl RouteReport {
    pub fn dropped(&self) -> usize {
        self.malformed + self.undeliverable
    }
}

#[derive(Clone)]
pub struct Router {
    registry: EntityRegistry,
}

impl Router {
    pub fn new(registry: EntityRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Dispatch a single record to its entity actor
    pub fn route(&self, record: TelemetryRecord) -> PipelineResult<()> {
        let Some(key) = record.key().map(str::to_owned) else {
            return Err(PipelineError::MalformedRecord(
                "record has no catalogNumber".to_string(),
            ));
        };

        let entity = self.registry.get_or_spawn(&key);
        trace!("routing record to {}", entity.address);
        entity.update(record)
    }

    /// Dispatch a drained batch, preserving its order
    pub fn route_batch(&self, batch: Vec<BufferedRecord>) -> RouteReport {
        let mut report = RouteReport::default();

        for buffered in batch {
            match self.route(buffered.record) {
                Ok(()) => report.routed += 1,
                Err(e) if e.is_malformed() => {
                    warn!("dropping record {:?}: {e}", buffered.key);
                    report.malformed += 1;
                }
                Err(e) => {
                    warn!("dropping record {:?}: {e}", buffered.key);
                    report.undeliverable += 1;
                }
            }
        }

        debug!(
            "routed {} records ({} dropped)",
            report.routed,
            report.dropped()
        );
        report
    }
}
