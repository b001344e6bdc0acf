//! EntityActor - Stateful twin of one tracked object
//!
//! One actor per catalog number, created lazily by the registry on the first
//! record that names it. Its mailbox serializes every update for that object;
//! different objects update fully in parallel.
//!
//! ## Update Path
//!
//! ```text
//! Update(record) → overwrite current fields → append track point
//!                → forward summary to aggregator → stamp last update
//! ```
//!
//! A failed forward is logged and swallowed. It never rolls back or skips
//! the local state change.

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, instrument, trace, warn};

use crate::error::{PipelineError, PipelineResult};
use crate::records::{CatalogNumber, TelemetryRecord};
use crate::tracking::EntityState;

use super::aggregator::AggregatorHandle;
use super::messages::EntityCommand;

/// Actor owning the [`EntityState`] of a single object
pub struct EntityActor {
    state: EntityState,

    /// Command receiver
    command_rx: mpsc::UnboundedReceiver<EntityCommand>,

    /// Where summaries go after each accepted update
    aggregator: AggregatorHandle,
}

impl EntityActor {
    pub fn new(
        catalog_number: CatalogNumber,
        command_rx: mpsc::UnboundedReceiver<EntityCommand>,
        aggregator: AggregatorHandle,
    ) -> Self {
        Self {
            state: EntityState::new(catalog_number),
            command_rx,
            aggregator,
        }
    }

    /// Run the actor's main loop
    #[instrument(skip(self), fields(entity = %self.state.catalog_number))]
    pub async fn run(mut self) {
        trace!("starting entity actor");

        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                EntityCommand::Update { record } => self.apply(record),

                EntityCommand::GetState { respond_to } => {
                    let _ = respond_to.send(self.state.clone());
                }

                EntityCommand::Shutdown { respond_to } => {
                    trace!("received shutdown command");
                    let _ = respond_to.send(());
                    break;
                }
            }
        }

        trace!("entity actor stopped");
    }

    /// Apply one update. The only path that mutates the entity.
    fn apply(&mut self, record: TelemetryRecord) {
        if record.is_empty() {
            debug!("ignoring empty record");
            return;
        }

        let now = Utc::now().timestamp_millis();
        let summary = self.state.record_update(record, now);

        if let Err(e) = self.aggregator.add_or_update_entity(summary) {
            warn!("failed to forward summary: {e}");
        }

        self.state.mark_updated(now);
        trace!("applied update ({} track points)", self.state.history.len());
    }
}

/// Handle for an EntityActor
///
/// Sending never blocks: the mailbox is unbounded and delivery is
/// fire-and-forget.
#[derive(Clone)]
pub struct EntityHandle {
    sender: mpsc::UnboundedSender<EntityCommand>,

    /// Entity key
    pub catalog_number: CatalogNumber,

    /// Command target, e.g. `warp://localhost:9001/satellite/25544`
    pub address: String,
}

impl EntityHandle {
    /// Spawn a new entity actor
    pub fn spawn(
        catalog_number: CatalogNumber,
        address: String,
        aggregator: AggregatorHandle,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        let actor = EntityActor::new(catalog_number.clone(), cmd_rx, aggregator);
        tokio::spawn(actor.run());

        Self {
            sender: cmd_tx,
            catalog_number,
            address,
        }
    }

    /// Queue a record for this entity
    pub fn update(&self, record: TelemetryRecord) -> PipelineResult<()> {
        self.sender
            .send(EntityCommand::Update { record })
            .map_err(|_| PipelineError::delivery(&self.address, "entity mailbox closed"))
    }

    /// Get a copy of the entity's state, after every update queued before this call
    pub async fn state(&self) -> Result<EntityState> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(EntityCommand::GetState { respond_to: tx })
            .map_err(|_| anyhow::anyhow!("entity {} has stopped", self.catalog_number))?;
        rx.await.context("entity dropped the request")
    }

    /// Gracefully shut down the actor once its mailbox is drained
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        if self
            .sender
            .send(EntityCommand::Shutdown { respond_to: tx })
            .is_ok()
        {
            let _ = rx.await;
        }
    }
}
