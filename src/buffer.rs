//! TelemetryBuffer - arrival-ordered holding area between broker and router
//!
//! Records are keyed by a monotonically increasing arrival sequence and
//! drained in ascending key order. `drain_all` swaps the whole queue out under
//! the lock, so a concurrent `push` lands either in the drained batch or in the
//! next one, never in both and never lost.
//!
//! ## Load shedding
//!
//! Upstream applies no backpressure. With `max_buffered = None` the buffer
//! grows without bound and only logs a warning past [`GROWTH_WARNING`]
//! records. With `Some(n)` the oldest records are evicted once `n` is
//! exceeded.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{trace, warn};

use crate::records::TelemetryRecord;

/// Buffered record count at which an unbounded buffer starts warning
pub const GROWTH_WARNING: usize = 50_000;

/// Position of a record in arrival order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ArrivalKey(pub u64);

/// A record waiting to be routed
#[derive(Debug, Clone)]
pub struct BufferedRecord {
    pub key: ArrivalKey,
    pub received_millis: i64,
    pub record: TelemetryRecord,
}

/// Buffer counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BufferStats {
    /// Records currently waiting
    pub buffered: usize,

    /// Records ever pushed
    pub total_pushed: u64,

    /// Records dropped by the drop-oldest policy
    pub evicted: u64,
}

#[derive(Debug, Default)]
struct BufferInner {
    records: VecDeque<BufferedRecord>,
    next_key: u64,
    total_pushed: u64,
    evicted: u64,
    growth_warned: bool,
}

/// Shared FIFO buffer of decoded records
///
/// Cloning yields another handle to the same buffer.
#[derive(Debug, Clone)]
pub struct TelemetryBuffer {
    inner: Arc<Mutex<BufferInner>>,
    max_buffered: Option<usize>,
}

impl Default for TelemetryBuffer {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl TelemetryBuffer {
    /// Buffer without a size limit
    pub fn unbounded() -> Self {
        Self::new(None)
    }

    /// Buffer that evicts its oldest records beyond `max_buffered`
    pub fn bounded(max_buffered: usize) -> Self {
        Self::new(Some(max_buffered.max(1)))
    }

    pub fn new(max_buffered: Option<usize>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(BufferInner::default())),
            max_buffered,
        }
    }

    /// Append a record, returning its arrival key
    pub fn push(&self, record: TelemetryRecord) -> ArrivalKey {
        let mut inner = self.inner.lock();

        let key = ArrivalKey(inner.next_key);
        inner.next_key += 1;
        inner.total_pushed += 1;
        inner.records.push_back(BufferedRecord {
            key,
            received_millis: Utc::now().timestamp_millis(),
            record,
        });

        match self.max_buffered {
            Some(max) => {
                while inner.records.len() > max {
                    if let Some(dropped) = inner.records.pop_front() {
                        inner.evicted += 1;
                        warn!(
                            "buffer full ({max}), evicting record {:?} ({})",
                            dropped.key,
                            dropped.record.key().unwrap_or("<no key>")
                        );
                    }
                }
            }
            None => {
                if inner.records.len() >= GROWTH_WARNING && !inner.growth_warned {
                    inner.growth_warned = true;
                    warn!(
                        "telemetry buffer holds {} records and has no size limit; router is falling behind",
                        inner.records.len()
                    );
                }
            }
        }

        trace!("buffered record {key:?}");
        key
    }

    /// Remove and return every buffered record in ascending arrival order
    pub fn drain_all(&self) -> Vec<BufferedRecord> {
        let mut inner = self.inner.lock();
        inner.growth_warned = false;
        let drained = std::mem::take(&mut inner.records);
        drop(inner);

        Vec::from(drained)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().records.is_empty()
    }

    pub fn stats(&self) -> BufferStats {
        let inner = self.inner.lock();
        BufferStats {
            buffered: inner.records.len(),
            total_pushed: inner.total_pushed,
            evicted: inner.evicted,
        }
    }
}
