//! Broker adapters feeding the ingestion loop
//!
//! The message broker itself (client, deserializer, schema registry) lives
//! outside this crate. The ingestion loop only sees the [`BrokerSource`]
//! trait: connect, poll for raw payloads, commit, close.
//!
//! ## Adapters
//!
//! - **channel**: in-process adapter fed through a [`channel::ChannelPublisher`]
//! - **replay**: newline-delimited payloads replayed from a file

pub mod channel;
pub mod replay;

use std::time::Duration;

use async_trait::async_trait;

use crate::config::{BrokerConfig, SourceConfig};
use crate::error::{PipelineError, PipelineResult};

pub use channel::{ChannelBroker, ChannelPublisher};
pub use replay::ReplayBroker;

/// A source of raw broker payloads
///
/// Errors returned from any method are transient from the pipeline's point of
/// view: the ingestion loop logs them and polls again on the next interval.
#[async_trait]
pub trait BrokerSource: Send {
    /// Open the connection (or re-open it after `close`)
    async fn connect(&mut self) -> PipelineResult<()>;

    /// Wait up to `timeout` for payloads and return every one available
    ///
    /// An empty vector means nothing arrived in time.
    ///
    /// # Cancel safety
    ///
    /// Implementations must be cancel-safe. The ingestion loop races `poll`
    /// against its command mailbox and drops the future when a command wins,
    /// so payloads taken off the wire before that point have to be kept on
    /// `self` and returned by the next call.
    async fn poll(&mut self, timeout: Duration) -> PipelineResult<Vec<Vec<u8>>>;

    /// Acknowledge everything returned by previous polls
    async fn commit(&mut self) -> PipelineResult<()> {
        Ok(())
    }

    /// Release the connection
    async fn close(&mut self);

    /// Human-readable description for logs
    fn describe(&self) -> String;
}

/// Build the adapter selected in the configuration
pub fn from_config(config: &BrokerConfig) -> PipelineResult<Box<dyn BrokerSource>> {
    match &config.source {
        Some(SourceConfig::Replay {
            path,
            messages_per_poll,
        }) => Ok(Box::new(ReplayBroker::new(path.clone(), *messages_per_poll))),
        None => Err(PipelineError::BrokerUnavailable(format!(
            "no broker client configured for {} (topic {})",
            config.address.as_deref().unwrap_or("<unset>"),
            config.topic.as_deref().unwrap_or("<unset>"),
        ))),
    }
}
