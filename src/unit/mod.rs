//! Units of work for Ripple-Harvest
//!
//! A unit of work is one independently harvestable subject. This module
//! provides the [`WorkUnit`] trait the engine is generic over, the two
//! concrete flavors (geographic points and event/category pairs), and the
//! loaders that enumerate them from delimited files.

mod event;
mod geo;
mod source;

use std::fmt;

pub use event::EventCategory;
pub use geo::GeoPoint;
pub use source::{load_event_pairs, load_points, LoadReport};

/// Stable two-part identity of a unit
///
/// The parts are written verbatim into the checkpoint, so they must never
/// contain a comma or a line break. Loaders reject such units.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitKey {
    pub primary: String,
    pub secondary: String,
}

impl UnitKey {
    pub fn new(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary: secondary.into(),
        }
    }

    /// Returns true if both parts can be stored in a checkpoint line
    pub fn is_storable(&self) -> bool {
        [&self.primary, &self.secondary]
            .iter()
            .all(|part| !part.is_empty() && !part.contains([',', '\n', '\r']))
    }
}

impl fmt::Display for UnitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.primary, self.secondary)
    }
}

/// One independently harvestable subject
///
/// Implementations must keep `key()` stable across runs: it is the identity
/// the checkpoint is keyed by.
pub trait WorkUnit: Clone + Send + Sync + fmt::Debug + 'static {
    /// Identity used for checkpointing and de-duplication
    fn key(&self) -> UnitKey;

    /// Filesystem-safe name used for raw artifacts and log lines
    fn label(&self) -> String;
}

/// Turns a display name into a filesystem-safe label
///
/// Lowercases the name and replaces spaces and path separators with `_`.
pub fn sanitize_label(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            other => other,
        })
        .collect()
}
