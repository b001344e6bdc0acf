//! Replay adapter: serves captured broker payloads from a file
//!
//! The file holds one raw payload per line. Each poll returns up to
//! `messages_per_poll` lines. Once the file is exhausted polls simply wait out
//! their timeout and return nothing.
//!
//! Lines are staged in `pending` as they are read, so a poll that is cancelled
//! halfway through a chunk loses nothing: the next poll picks up where it left
//! off and returns the staged lines first.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tracing::{debug, info};

use crate::error::{PipelineError, PipelineResult};

use super::BrokerSource;

pub struct ReplayBroker {
    path: PathBuf,
    messages_per_poll: usize,
    lines: Option<Lines<BufReader<File>>>,
    /// Lines read but not yet handed out
    pending: Vec<Vec<u8>>,
    exhausted: bool,
}

impl ReplayBroker {
    pub fn new(path: PathBuf, messages_per_poll: usize) -> Self {
        Self {
            path,
            messages_per_poll: messages_per_poll.max(1),
            lines: None,
            pending: Vec::new(),
            exhausted: false,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

#[async_trait]
impl BrokerSource for ReplayBroker {
    async fn connect(&mut self) -> PipelineResult<()> {
        let file = File::open(&self.path).await.map_err(|e| {
            PipelineError::BrokerUnavailable(format!("cannot open {}: {e}", self.path.display()))
        })?;

        // reopening starts the file over, so anything staged would repeat
        self.lines = Some(BufReader::new(file).lines());
        self.pending.clear();
        self.exhausted = false;
        info!("replaying broker payloads from {}", self.path.display());
        Ok(())
    }

    async fn poll(&mut self, timeout: Duration) -> PipelineResult<Vec<Vec<u8>>> {
        let Some(lines) = self.lines.as_mut() else {
            return Err(PipelineError::BrokerUnavailable(format!(
                "replay file {} is not open",
                self.path.display()
            )));
        };

        while !self.exhausted && self.pending.len() < self.messages_per_poll {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => self.pending.push(line.into_bytes()),
                Ok(None) => {
                    debug!("replay file exhausted");
                    self.exhausted = true;
                }
                Err(e) => {
                    return Err(PipelineError::BrokerUnavailable(format!(
                        "failed to read {}: {e}",
                        self.path.display()
                    )));
                }
            }
        }

        if self.pending.is_empty() {
            tokio::time::sleep(timeout).await;
        }
        Ok(std::mem::take(&mut self.pending))
    }

    async fn close(&mut self) {
        self.lines = None;
        debug!("replay file closed");
    }

    fn describe(&self) -> String {
        format!("replay of {}", self.path.display())
    }
}
