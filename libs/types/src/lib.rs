//! Types library for the live quiz leaderboard platform
//!
//! This library provides the core type definitions shared across the
//! leaderboard pipeline, ensuring type safety and deterministic ranking
//! behavior.
//!
//! # Modules
//! - `ids`: Unique identifiers (QuizId, ParticipantId, SessionId, ConnectionId)
//! - `score`: Non-negative score values
//! - `snapshot`: Derived leaderboard snapshot types

// Public modules
pub mod ids;
pub mod score;
pub mod snapshot;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::ids::*;
    pub use crate::score::*;
    pub use crate::snapshot::*;
}
