//! IngestActor - Drives the broker poll loop
//!
//! Each cycle polls the broker once, decodes every payload into records, pushes
//! them into the [`TelemetryBuffer`], commits, then drains the buffer and hands
//! the batch to the [`Router`]. Nothing stays buffered between cycles.
//!
//! ## Message Flow
//!
//! ```text
//! Broker poll → decode → TelemetryBuffer::push → commit → drain_all → Router::route_batch
//!     ↑
//!     └─── Commands (PollNow, Reconnect, GetStats, Shutdown)
//! ```
//!
//! Broker failures never stop the loop: they are counted, logged and retried
//! after one poll interval.
//!
//! Dropping every [`IngestHandle`] stops the loop the same way `shutdown` does.

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, instrument, trace, warn};

use crate::broker::BrokerSource;
use crate::buffer::TelemetryBuffer;
use crate::config::Config;
use crate::error::PipelineResult;
use crate::records::decode_payload;

use super::messages::{IngestCommand, IngestStats};
use super::registry::EntityRegistry;
use super::router::Router;

/// Ingestion parameters taken from the configuration
#[derive(Debug, Clone)]
pub struct IngestSettings {
    pub poll_interval: Duration,
    pub record_key: Option<String>,
    pub max_buffered: Option<usize>,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1000),
            record_key: Some(String::from("tleDataset")),
            max_buffered: None,
        }
    }
}

impl From<&Config> for IngestSettings {
    fn from(config: &Config) -> Self {
        Self {
            poll_interval: config.broker.poll_interval(),
            record_key: config.broker.record_key.clone(),
            max_buffered: config.buffer.max_buffered,
        }
    }
}

pub struct IngestActor {
    broker: Box<dyn BrokerSource>,

    buffer: TelemetryBuffer,

    router: Router,

    /// Command receiver for control messages
    command_rx: mpsc::Receiver<IngestCommand>,

    poll_interval: Duration,

    /// Envelope field holding the record list
    record_key: Option<String>,

    stats: IngestStats,
}

impl IngestActor {
    pub fn new(
        broker: Box<dyn BrokerSource>,
        router: Router,
        command_rx: mpsc::Receiver<IngestCommand>,
        settings: IngestSettings,
    ) -> Self {
        Self {
            broker,
            buffer: TelemetryBuffer::new(settings.max_buffered),
            router,
            command_rx,
            poll_interval: settings.poll_interval,
            record_key: settings.record_key,
            stats: IngestStats::default(),
        }
    }

    #[instrument(skip(self), fields(broker = %self.broker.describe()))]
    pub async fn run(mut self) {
        debug!("starting ingest actor");

        if let Err(e) = self.broker.connect().await {
            self.stats.broker_errors += 1;
            warn!("initial broker connection failed, will retry on poll: {e}");
        }

        loop {
            tokio::select! {
                biased;

                cmd = self.command_rx.recv() => {
                    let Some(cmd) = cmd else {
                        warn!("all ingest handles dropped, shutting down");
                        self.stop().await;
                        break;
                    };

                    match cmd {
                        IngestCommand::PollNow { respond_to } => {
                            debug!("received PollNow command");
                            let result = self.cycle(Duration::ZERO).await;
                            let _ = respond_to.send(result);
                        }

                        IngestCommand::Reconnect { respond_to } => {
                            debug!("received Reconnect command");
                            let result = self.reconnect().await;
                            let _ = respond_to.send(result);
                        }

                        IngestCommand::GetStats { respond_to } => {
                            let _ = respond_to.send(self.snapshot());
                        }

                        IngestCommand::Shutdown { respond_to } => {
                            debug!("received shutdown command");
                            self.stop().await;
                            let _ = respond_to.send(self.snapshot());
                            break;
                        }
                    }
                }

                result = self.broker.poll(self.poll_interval) => {
                    match result {
                        Ok(payloads) => {
                            self.process(payloads).await;
                        }
                        Err(e) => {
                            self.stats.broker_errors += 1;
                            warn!("broker poll failed: {e}");
                            tokio::time::sleep(self.poll_interval).await;
                            if let Err(e) = self.broker.connect().await {
                                trace!("reconnect attempt failed: {e}");
                            }
                        }
                    }
                }
            }
        }

        debug!("ingest actor stopped");
    }

    /// One explicit poll cycle; returns the number of records routed
    async fn cycle(&mut self, timeout: Duration) -> PipelineResult<usize> {
        let payloads = self.broker.poll(timeout).await.inspect_err(|_| {
            self.stats.broker_errors += 1;
        })?;
        Ok(self.process(payloads).await)
    }

    async fn process(&mut self, payloads: Vec<Vec<u8>>) -> usize {
        self.stats.polls += 1;
        self.stats.messages += payloads.len() as u64;

        for raw in &payloads {
            self.on_payload(raw);
        }

        if !payloads.is_empty()
            && let Err(e) = self.broker.commit().await
        {
            self.stats.broker_errors += 1;
            warn!("broker commit failed: {e}");
        }

        self.flush()
    }

    /// Decode one raw payload into the buffer
    fn on_payload(&mut self, raw: &[u8]) {
        match decode_payload(raw, self.record_key.as_deref()) {
            Ok(decoded) => {
                self.stats.decode_failures += decoded.rejected.len() as u64;

                for record in decoded.records {
                    self.buffer.push(record);
                }
            }
            Err(e) => {
                self.stats.decode_failures += 1;
                error!("failed to decode broker payload: {e}");
            }
        }
    }

    /// Drain the buffer and route everything in arrival order
    fn flush(&mut self) -> usize {
        let batch = self.buffer.drain_all();
        if batch.is_empty() {
            return 0;
        }

        let report = self.router.route_batch(batch);
        self.stats.records_routed += report.routed as u64;
        self.stats.records_dropped += report.dropped() as u64;
        report.routed
    }

    async fn reconnect(&mut self) -> PipelineResult<()> {
        self.broker.close().await;
        self.broker.connect().await.inspect_err(|_| {
            self.stats.broker_errors += 1;
        })?;
        info!("reconnected to {}", self.broker.describe());
        Ok(())
    }

    async fn stop(&mut self) {
        let routed = self.flush();
        if routed > 0 {
            debug!("routed {routed} buffered records before stopping");
        }
        self.broker.close().await;
        self.router.registry().shutdown_all().await;
    }

    fn snapshot(&self) -> IngestStats {
        IngestStats {
            buffer: self.buffer.stats(),
            entities: self.router.registry().len(),
            ..self.stats
        }
    }
}

/// Handle for the IngestActor
#[derive(Clone)]
pub struct IngestHandle {
    sender: mpsc::Sender<IngestCommand>,
    registry: EntityRegistry,
}

impl IngestHandle {
    /// Spawn the ingestion loop over `broker`
    pub fn spawn(
        broker: Box<dyn BrokerSource>,
        registry: EntityRegistry,
        settings: IngestSettings,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = IngestActor::new(broker, Router::new(registry.clone()), cmd_rx, settings);
        tokio::spawn(actor.run());

        Self {
            sender: cmd_tx,
            registry,
        }
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Run a poll cycle now, without waiting for new payloads
    pub async fn poll_now(&self) -> Result<usize> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(IngestCommand::PollNow { respond_to: tx })
            .await
            .context("failed to send PollNow command")?;

        Ok(rx.await.context("failed to receive response")??)
    }

    pub async fn reconnect(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(IngestCommand::Reconnect { respond_to: tx })
            .await
            .context("failed to send Reconnect command")?;

        Ok(rx.await.context("failed to receive response")??)
    }

    pub async fn stats(&self) -> Result<IngestStats> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(IngestCommand::GetStats { respond_to: tx })
            .await
            .context("failed to send GetStats command")?;

        rx.await.context("failed to receive response")
    }

    /// Stop ingestion
    ///
    /// Routes whatever is still buffered, closes the broker and waits until
    /// every entity actor has worked through its mailbox.
    pub async fn shutdown(&self) -> Result<IngestStats> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(IngestCommand::Shutdown { respond_to: tx })
            .await
            .context("failed to send Shutdown command")?;

        rx.await.context("failed to receive response")
    }
}
