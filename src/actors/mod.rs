//! Actor-based telemetry pipeline
//!
//! Every stateful component runs as an independent tokio task that owns its
//! state exclusively and is reached only through its mailbox.
//!
//! ## Architecture Overview
//!
//! ```text
//!            ┌──────────────┐
//!            │    Broker    │
//!            └──────┬───────┘
//!                   │ poll
//!            ┌──────▼───────┐     push      ┌─────────────────┐
//!            │ IngestActor  │──────────────→│ TelemetryBuffer │
//!            └──────┬───────┘←──────────────└─────────────────┘
//!                   │          drain_all
//!            ┌──────▼───────┐
//!            │    Router    │ get_or_spawn (EntityRegistry)
//!            └──────┬───────┘
//!         ┌─────────┼──────────┐
//!  ┌──────▼─────┐   │   ┌──────▼─────┐
//!  │ Entity-1   │  ...  │ Entity-N   │  one per catalog number
//!  └──────┬─────┘       └──────┬─────┘
//!         └─────────┬──────────┘
//!                   │ AddOrUpdateEntity
//!          ┌────────▼─────────┐
//!          │ AggregatorActor  │──→ FleetEvent (broadcast)
//!          └──────────────────┘
//! ```
//!
//! ## Communication Patterns
//!
//! 1. **Updates**: fire-and-forget sends on unbounded mailboxes, so a busy
//!    actor never stalls the one upstream of it
//! 2. **Events**: the aggregator publishes fleet changes on a broadcast channel
//! 3. **Request/Response**: oneshot channels for queries and shutdown acks

pub mod aggregator;
pub mod entity;
pub mod ingest;
pub mod messages;
pub mod registry;
pub mod router;
