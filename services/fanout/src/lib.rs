//! Fan-out dispatch service
//!
//! Bridges score ingestion to the live delivery surfaces:
//! - Score ingestion applies the ratchet and queues update events
//! - The dispatcher consumes the log and recomputes leaderboards
//! - The snapshot hub broadcasts recomputed snapshots to subscribers
//! - The connection registry pushes serialized payloads to realtime
//!   connections with per-connection backpressure
//!
//! # Architecture
//!
//! ```text
//! Score submissions (HTTP / WS)
//!        │
//!   ┌────▼──────┐      ┌─────────────┐
//!   │ Ingestion │─────▶│ RankedStore │
//!   └────┬──────┘      └──────▲──────┘
//!        │ append             │ top-K
//!   ┌────▼──────┐      ┌──────┴──────┐
//!   │ UpdateLog │─────▶│ Dispatcher  │
//!   └───────────┘ read └──────┬──────┘
//!                             │ publish
//!                      ┌──────▼──────┐
//!                      │ SnapshotHub │
//!                      └──┬───────┬──┘
//!                    SSE ◀┘       └▶ Registry ─▶ WebSocket
//! ```

pub mod catalog;
pub mod dispatcher;
pub mod hub;
pub mod ingestion;
pub mod metrics;
pub mod registry;

pub use catalog::{CatalogError, QuizCatalog};
pub use dispatcher::{DispatcherConfig, FanoutDispatcher, FANOUT_GROUP};
pub use hub::SnapshotHub;
pub use ingestion::{IngestConfig, IngestError, IngestOutcome, ScoreIngestion};
pub use metrics::DispatchMetrics;
pub use registry::ConnectionRegistry;

// Library version
pub const SERVICE_VERSION: &str = "0.1.0";
