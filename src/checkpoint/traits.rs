//! Checkpoint traits and error types
//!
//! This module defines the trait interface for progress stores and
//! associated error types.

use crate::state::ResumeState;
use crate::unit::UnitKey;
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during checkpoint operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unit key '{0}' cannot be stored in a checkpoint line")]
    InvalidKey(UnitKey),

    #[error("Cursor for {key} would move backwards ({current} -> {requested})")]
    CursorRegression {
        key: UnitKey,
        current: u32,
        requested: u32,
    },

    #[error("Unit {0} is already complete")]
    AlreadyComplete(UnitKey),

    #[error("Checkpoint lock poisoned")]
    Poisoned,
}

/// Result type for checkpoint operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Resume state of every unit mentioned in the checkpoint
pub type ProgressMap = HashMap<UnitKey, ResumeState>;

/// Resume policy: absent units start at page 0
pub fn resume_point(progress: &ProgressMap, key: &UnitKey) -> ResumeState {
    progress.get(key).copied().unwrap_or(ResumeState::START)
}

/// Trait for progress store implementations
///
/// `record` and `complete` are called concurrently by every worker.
/// Implementations serialize them so each call lands as one whole entry.
pub trait ProgressStore: Send + Sync {
    /// Reads the checkpoint once, before any unit is dispatched
    ///
    /// Malformed entries are skipped, never fatal.
    fn load(&self) -> StoreResult<ProgressMap>;

    /// Records the next page to fetch for a unit
    ///
    /// # Errors
    ///
    /// * `CursorRegression` - the cursor is lower than the last recorded one
    /// * `AlreadyComplete` - the unit has been marked done
    fn record(&self, key: &UnitKey, next_page: u32) -> StoreResult<()>;

    /// Marks a unit as complete; it is never dispatched again
    fn complete(&self, key: &UnitKey) -> StoreResult<()>;

    /// Current resume state of a unit as seen by this store
    fn state(&self, key: &UnitKey) -> ResumeState;

    /// Erases all progress
    fn clear(&self) -> StoreResult<()>;
}
