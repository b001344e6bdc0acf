pub mod actors;
#[cfg(feature = "api")]
pub mod api;
pub mod broker;
pub mod buffer;
pub mod config;
pub mod error;
pub mod fleet;
pub mod records;
pub mod tracking;
pub mod util;

pub use error::{PipelineError, PipelineResult};
pub use fleet::ObjectClass;
pub use records::{CatalogNumber, EntitySummary, TelemetryRecord, TrackPoint};
pub use tracking::{EntityState, HISTORY_LIMIT};
