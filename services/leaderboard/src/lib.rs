//! Ranked Score Store
//!
//! In-memory ranked leaderboards with monotonic score semantics: a
//! participant's stored score only ever increases, so resubmission and
//! redelivery are always safe.
//!
//! **Key Invariants:**
//! - At most one entry per (quiz, participant), equal to the maximum
//!   score ever accepted for that pair
//! - Top-K is ordered by descending score, ascending participant id on
//!   ties (deterministic across processes)
//! - A submission locks one quiz's board only; quizzes never contend
//!   with each other

pub mod board;
pub mod store;

pub use store::{LeaderboardStore, DEFAULT_TOP_K};
