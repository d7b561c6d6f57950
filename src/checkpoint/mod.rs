//! Checkpoint module for persisting harvest progress
//!
//! This module records how far every unit has progressed so a re-run
//! resumes exactly where the previous one stopped:
//! - Append-only text log, one entry per checkpointed page
//! - Sticky completion markers
//! - Tolerant loading (malformed entries are skipped)

mod file;
mod traits;

pub use file::FileProgressStore;
pub use traits::{resume_point, ProgressMap, ProgressStore, StoreError, StoreResult};

use crate::HarvestError;
use std::path::Path;

/// Opens the checkpoint at `path` and loads its progress
///
/// # Returns
///
/// * `Ok((FileProgressStore, ProgressMap))` - The store and the resume state of every known unit
/// * `Err(HarvestError)` - The checkpoint exists but cannot be read
pub fn open_checkpoint(path: &Path) -> Result<(FileProgressStore, ProgressMap), HarvestError> {
    let store = FileProgressStore::new(path);
    let progress = store.load()?;
    Ok((store, progress))
}
