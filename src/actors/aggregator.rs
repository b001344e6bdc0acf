//! AggregatorActor - Single owner of the fleet-wide indices
//!
//! There is exactly one aggregator. Every entity actor forwards a summary to it
//! after each accepted update, and it applies them strictly one at a time.
//! That makes it the only place cross-entity counters change, and also the
//! pipeline's throughput ceiling: the handle keeps a live count of queued
//! summaries so the backlog can be observed.
//!
//! ## Message Flow
//!
//! ```text
//! EntityActor-1 ─┐
//! EntityActor-2 ─┼─ AddOrUpdateEntity ─→ AggregatorActor ─→ FleetEvent (broadcast)
//! EntityActor-N ─┘                              ↑
//!                         Queries (GetEntities, GetTypeCounts, ...)
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, instrument, trace, warn};

use crate::error::{PipelineError, PipelineResult};
use crate::fleet::{AggregationState, NamedCount, ObjectClass, Upsert};
use crate::records::EntitySummary;

use super::messages::{AggregatorCommand, AggregatorStats, FleetEvent};

/// Capacity of the fleet event channel
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Actor owning the [`AggregationState`]
pub struct AggregatorActor {
    state: AggregationState,

    /// Command receiver
    command_rx: mpsc::UnboundedReceiver<AggregatorCommand>,

    /// Summaries sent but not yet applied, shared with every handle
    backlog: Arc<AtomicUsize>,

    /// Broadcast sender for fleet events
    event_tx: broadcast::Sender<FleetEvent>,

    summaries_applied: u64,
    first_sightings: u64,
    peak_backlog: usize,
}

impl AggregatorActor {
    pub fn new(
        command_rx: mpsc::UnboundedReceiver<AggregatorCommand>,
        backlog: Arc<AtomicUsize>,
        event_tx: broadcast::Sender<FleetEvent>,
    ) -> Self {
        Self {
            state: AggregationState::new(),
            command_rx,
            backlog,
            event_tx,
            summaries_applied: 0,
            first_sightings: 0,
            peak_backlog: 0,
        }
    }

    /// Run the actor's main loop
    ///
    /// Runs until a Shutdown command is received or every handle is dropped.
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        debug!("starting aggregator actor");

        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                AggregatorCommand::AddOrUpdateEntity { summary } => {
                    let queued = self.backlog.fetch_sub(1, Ordering::AcqRel);
                    self.peak_backlog = self.peak_backlog.max(queued);
                    self.add_or_update_entity(summary);
                }

                AggregatorCommand::GetEntity {
                    catalog_number,
                    respond_to,
                } => {
                    let _ = respond_to.send(self.state.entity(&catalog_number).cloned());
                }

                AggregatorCommand::GetEntities { respond_to } => {
                    let _ = respond_to.send(self.state.entities());
                }

                AggregatorCommand::GetMembers { class, respond_to } => {
                    let _ = respond_to.send(self.state.members_of(class));
                }

                AggregatorCommand::GetTypeCounts { respond_to } => {
                    let _ = respond_to.send(self.state.by_type().clone());
                }

                AggregatorCommand::GetCountryCounts { respond_to } => {
                    let _ = respond_to.send(self.state.by_country().clone());
                }

                AggregatorCommand::GetStats { respond_to } => {
                    let _ = respond_to.send(self.stats());
                }

                AggregatorCommand::Shutdown { respond_to } => {
                    debug!("received shutdown command");
                    let _ = respond_to.send(());
                    break;
                }
            }
        }

        debug!(
            "aggregator actor stopped after {} summaries ({} entities)",
            self.summaries_applied,
            self.state.len()
        );
    }

    fn add_or_update_entity(&mut self, summary: EntitySummary) {
        let event = match self.state.add_or_update_entity(summary.clone()) {
            Upsert::FirstSighting { class } => {
                self.first_sightings += 1;
                FleetEvent::EntityAdded { summary, class }
            }
            Upsert::Updated => FleetEvent::EntityUpdated { summary },
        };
        self.summaries_applied += 1;

        // No subscribers is fine
        if let Ok(receivers) = self.event_tx.send(event) {
            trace!("published fleet event to {receivers} receivers");
        }
    }

    fn stats(&self) -> AggregatorStats {
        AggregatorStats {
            summaries_applied: self.summaries_applied,
            first_sightings: self.first_sightings,
            entities: self.state.len(),
            backlog: self.backlog.load(Ordering::Acquire),
            peak_backlog: self.peak_backlog,
        }
    }
}

/// Handle for the AggregatorActor
///
/// Cheap to clone; every entity actor holds one.
#[derive(Clone)]
pub struct AggregatorHandle {
    sender: mpsc::UnboundedSender<AggregatorCommand>,
    backlog: Arc<AtomicUsize>,
    event_tx: broadcast::Sender<FleetEvent>,

    /// Address used in logs and delivery errors
    pub address: String,
}

impl AggregatorHandle {
    /// Spawn the aggregator actor
    pub fn spawn(address: impl Into<String>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let backlog = Arc::new(AtomicUsize::new(0));

        let actor = AggregatorActor::new(cmd_rx, backlog.clone(), event_tx.clone());
        tokio::spawn(actor.run());

        Self {
            sender: cmd_tx,
            backlog,
            event_tx,
            address: address.into(),
        }
    }

    /// Queue a summary; never waits for the aggregator
    pub fn add_or_update_entity(&self, summary: EntitySummary) -> PipelineResult<()> {
        self.backlog.fetch_add(1, Ordering::AcqRel);
        self.sender
            .send(AggregatorCommand::AddOrUpdateEntity { summary })
            .map_err(|_| {
                self.backlog.fetch_sub(1, Ordering::AcqRel);
                PipelineError::delivery(&self.address, "aggregator mailbox closed")
            })
    }

    /// Summaries queued but not yet applied
    pub fn backlog(&self) -> usize {
        self.backlog.load(Ordering::Acquire)
    }

    /// Subscribe to fleet events
    pub fn subscribe(&self) -> broadcast::Receiver<FleetEvent> {
        self.event_tx.subscribe()
    }

    pub async fn entity(&self, catalog_number: impl Into<String>) -> Result<Option<EntitySummary>> {
        self.request(|respond_to| AggregatorCommand::GetEntity {
            catalog_number: catalog_number.into(),
            respond_to,
        })
        .await
    }

    pub async fn entities(&self) -> Result<Vec<EntitySummary>> {
        self.request(|respond_to| AggregatorCommand::GetEntities { respond_to })
            .await
    }

    pub async fn members(&self, class: ObjectClass) -> Result<Vec<EntitySummary>> {
        self.request(|respond_to| AggregatorCommand::GetMembers { class, respond_to })
            .await
    }

    pub async fn type_counts(&self) -> Result<BTreeMap<ObjectClass, NamedCount>> {
        self.request(|respond_to| AggregatorCommand::GetTypeCounts { respond_to })
            .await
    }

    pub async fn country_counts(&self) -> Result<BTreeMap<String, NamedCount>> {
        self.request(|respond_to| AggregatorCommand::GetCountryCounts { respond_to })
            .await
    }

    pub async fn stats(&self) -> Result<AggregatorStats> {
        self.request(|respond_to| AggregatorCommand::GetStats { respond_to })
            .await
    }

    /// Gracefully shut down the aggregator
    ///
    /// Returns once every summary queued before this call has been applied.
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        if self
            .sender
            .send(AggregatorCommand::Shutdown { respond_to: tx })
            .is_err()
        {
            warn!("aggregator already stopped");
            return;
        }
        let _ = rx.await;
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> AggregatorCommand,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(command(tx))
            .map_err(|_| anyhow::anyhow!("aggregator mailbox closed"))?;
        rx.await.context("aggregator dropped the request")
    }
}
