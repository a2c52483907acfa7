//! Update Event Log
//!
//! Append-only log of accepted score updates with named consumer
//! groups, decoupling score producers from fan-out workers.
//!
//! **Delivery guarantees:**
//! - Per group, entries are first delivered in append order
//! - At-least-once: an entry leaves the pending set only on explicit
//!   acknowledgment; unacked entries are redelivered after an idle
//!   timeout
//! - Bounded backlog: appends fail rather than evicting
//!   unacknowledged work
//!
//! Consumers must tolerate re-processing. Downstream that holds
//! naturally: snapshot recomputation is pure and the ranked store's
//! ratchet makes re-applied scores no-ops.

pub mod event;
pub mod log;
pub mod update_log;

pub use event::{EventId, ScoreEvent};
pub use log::{LogConfig, LogError, PendingDelivery};
pub use update_log::{STREAM_NAME, UpdateLog};
