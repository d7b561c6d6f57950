//! State module for tracking harvest progress
//!
//! This module provides the state types shared by the walker, the checkpoint
//! and the scheduler.
//!
//! # Components
//!
//! - `WalkState`: the pagination state machine of a single unit
//! - `ResumeState`: where a unit stands according to the checkpoint
//! - `UnitOutcome`: the terminal result of a unit within one run

mod outcome;
mod walk_state;

// Re-export main types
pub use outcome::{ResumeState, UnitOutcome, DONE_MARKER};
pub use walk_state::WalkState;
