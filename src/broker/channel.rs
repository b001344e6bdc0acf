//! In-process broker adapter
//!
//! Payloads published through a [`ChannelPublisher`] come out of the paired
//! [`ChannelBroker`]'s polls in publish order. The publisher can also simulate
//! an outage, which makes polls fail with `BrokerUnavailable`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::error::{PipelineError, PipelineResult};

use super::BrokerSource;

/// Upper bound on payloads returned by one poll
const MAX_PER_POLL: usize = 500;

/// Create a connected publisher/broker pair
pub fn channel() -> (ChannelPublisher, ChannelBroker) {
    let (tx, rx) = mpsc::unbounded_channel();
    let available = Arc::new(AtomicBool::new(true));
    let connected = Arc::new(AtomicBool::new(false));

    (
        ChannelPublisher {
            sender: tx,
            available: available.clone(),
            connected: connected.clone(),
        },
        ChannelBroker {
            receiver: rx,
            available,
            connected,
        },
    )
}

/// Producer side of the in-process broker
#[derive(Clone)]
pub struct ChannelPublisher {
    sender: mpsc::UnboundedSender<Vec<u8>>,
    available: Arc<AtomicBool>,
    connected: Arc<AtomicBool>,
}

impl ChannelPublisher {
    pub fn publish(&self, payload: impl Into<Vec<u8>>) -> PipelineResult<()> {
        self.sender
            .send(payload.into())
            .map_err(|_| PipelineError::delivery("channel broker", "broker dropped"))
    }

    /// Toggle a simulated outage
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }

    /// Whether the consumer side is currently connected
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

/// Consumer side of the in-process broker
pub struct ChannelBroker {
    receiver: mpsc::UnboundedReceiver<Vec<u8>>,
    available: Arc<AtomicBool>,
    connected: Arc<AtomicBool>,
}

impl ChannelBroker {
    fn check_available(&self) -> PipelineResult<()> {
        if self.available.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(PipelineError::BrokerUnavailable(
                "channel broker is offline".to_string(),
            ))
        }
    }
}

#[async_trait]
impl BrokerSource for ChannelBroker {
    async fn connect(&mut self) -> PipelineResult<()> {
        self.check_available()?;
        self.connected.store(true, Ordering::Release);
        debug!("channel broker connected");
        Ok(())
    }

    // `recv` is the only await point and is cancel-safe; the drain loop never yields.
    async fn poll(&mut self, timeout: Duration) -> PipelineResult<Vec<Vec<u8>>> {
        if !self.connected.load(Ordering::Acquire) {
            return Err(PipelineError::BrokerUnavailable(
                "channel broker is not connected".to_string(),
            ));
        }
        self.check_available()?;

        let first = match tokio::time::timeout(timeout, self.receiver.recv()).await {
            Err(_) => return Ok(Vec::new()),
            Ok(None) => {
                return Err(PipelineError::BrokerUnavailable(
                    "all publishers are gone".to_string(),
                ));
            }
            Ok(Some(payload)) => payload,
        };

        let mut payloads = vec![first];
        while payloads.len() < MAX_PER_POLL {
            match self.receiver.try_recv() {
                Ok(payload) => payloads.push(payload),
                Err(_) => break,
            }
        }

        trace!("channel broker returned {} payloads", payloads.len());
        Ok(payloads)
    }

    async fn close(&mut self) {
        self.connected.store(false, Ordering::Release);
        debug!("channel broker closed");
    }

    fn describe(&self) -> String {
        "in-process channel".to_string()
    }
}
