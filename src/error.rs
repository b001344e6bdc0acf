//! Error types for the ingestion pipeline
//!
//! Every failure in the pipeline is isolated to the message that caused it.
//! Nothing here is ever escalated to process termination: callers log the
//! error and move on to the next record.

use thiserror::Error;

/// Result type alias for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors that can occur while ingesting, routing or aggregating telemetry
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The record has no usable entity key or payload. Dropped, never retried.
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// The raw payload could not be decoded. Treated like a malformed record.
    #[error("failed to decode record: {0}")]
    Decode(#[from] serde_json::Error),

    /// A command could not be handed to its target actor.
    #[error("failed to deliver to {target}: {reason}")]
    DeliveryFailure { target: String, reason: String },

    /// The message broker could not be reached. Transient, polling retries.
    #[error("broker unavailable: {0}")]
    BrokerUnavailable(String),
}

impl PipelineError {
    pub fn delivery(target: impl Into<String>, reason: impl Into<String>) -> Self {
        PipelineError::DeliveryFailure {
            target: target.into(),
            reason: reason.into(),
        }
    }

    /// Whether the failure invalidates the record itself (as opposed to its transport)
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            PipelineError::MalformedRecord(_) | PipelineError::Decode(_)
        )
    }
}
