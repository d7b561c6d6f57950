use std::fmt;

/// Marker written to the checkpoint for a completed unit
pub const DONE_MARKER: &str = "done";

/// Where a unit stands according to the checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResumeState {
    /// Next page to fetch
    Pending(u32),

    /// Never resumed or dispatched again
    Complete,
}

impl ResumeState {
    /// Resume point for a unit absent from the checkpoint
    pub const START: ResumeState = ResumeState::Pending(0);

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }

    /// Converts the state to its checkpoint field
    pub fn to_checkpoint_field(&self) -> String {
        match self {
            Self::Pending(page) => page.to_string(),
            Self::Complete => DONE_MARKER.to_string(),
        }
    }

    /// Parses a checkpoint field
    ///
    /// Returns None for anything that is neither the done marker nor a
    /// non-negative integer.
    pub fn from_checkpoint_field(field: &str) -> Option<Self> {
        let field = field.trim();
        if field == DONE_MARKER {
            return Some(Self::Complete);
        }
        field.parse::<u32>().ok().map(Self::Pending)
    }
}

impl Default for ResumeState {
    fn default() -> Self {
        Self::START
    }
}

/// Terminal outcome of one unit in a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOutcome {
    /// End of unit reached; checkpointed as done
    Completed { pages: u32, rows: u64 },

    /// Safety valve hit; checkpointed as done only if configured so
    PageLimit { pages: u32, rows: u64, marked_done: bool },

    /// Gave up; the checkpoint keeps the last recorded cursor
    Failed { page: u32, reason: String },

    /// Already complete in the checkpoint, never dispatched
    Skipped,

    /// Interrupted before reaching a terminal state
    Cancelled { page: u32 },
}

impl UnitOutcome {
    /// Returns true if the unit reached its end of unit signal
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Returns true if the unit will not be dispatched by a future run
    pub fn is_done(&self) -> bool {
        match self {
            Self::Completed { .. } | Self::Skipped => true,
            Self::PageLimit { marked_done, .. } => *marked_done,
            Self::Failed { .. } | Self::Cancelled { .. } => false,
        }
    }

    /// Rows persisted while producing this outcome
    pub fn rows(&self) -> u64 {
        match self {
            Self::Completed { rows, .. } | Self::PageLimit { rows, .. } => *rows,
            _ => 0,
        }
    }
}

impl fmt::Display for UnitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed { pages, rows } => {
                write!(f, "completed ({} pages, {} rows)", pages, rows)
            }
            Self::PageLimit { pages, rows, .. } => {
                write!(f, "page limit ({} pages, {} rows)", pages, rows)
            }
            Self::Failed { page, reason } => write!(f, "failed at page {}: {}", page, reason),
            Self::Skipped => write!(f, "skipped"),
            Self::Cancelled { page } => write!(f, "cancelled at page {}", page),
        }
    }
}
