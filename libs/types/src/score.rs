//! Score values for leaderboard entries
//!
//! Scores are non-negative integers. Validity is carried by the type:
//! a negative submission fails at deserialization instead of deep in
//! the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A participant's score on a quiz
///
/// Ordered numerically. The ranked store only ever replaces a stored
/// score with a strictly greater one (monotonic ratchet), so `Ord` here
/// is the whole comparison story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Score(u64);

impl Score {
    pub const ZERO: Score = Score(0);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for Score {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
