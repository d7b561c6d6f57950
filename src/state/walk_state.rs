/// Walk state definitions for one unit's pagination
///
/// This module defines every state a unit passes through while its pages are
/// walked, and the transitions the walker is allowed to take between them.
use std::fmt;

/// Represents the current state of a unit's pagination walk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WalkState {
    // ===== Active States =====
    /// Positioned at the page recovered from the checkpoint
    Resuming(u32),

    /// Requesting the given page from the remote service
    Fetching(u32),

    /// Decoding the response of the given page
    Parsing(u32),

    /// Writing the given page's rows, then its checkpoint entry
    Persisting(u32),

    // ===== Terminal States =====
    /// The service signalled the end of the unit
    StoppedSuccess,

    /// The walk gave up (retries exhausted, page limit, cancellation)
    StoppedFailure,
}

impl WalkState {
    /// Returns true if no further transition can happen
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::StoppedSuccess | Self::StoppedFailure)
    }

    /// Returns the page this state refers to, if any
    pub fn page(&self) -> Option<u32> {
        match self {
            Self::Resuming(p) | Self::Fetching(p) | Self::Parsing(p) | Self::Persisting(p) => {
                Some(*p)
            }
            Self::StoppedSuccess | Self::StoppedFailure => None,
        }
    }

    /// Checks whether moving from `self` to `next` is a legal transition
    ///
    /// Pages only move forward: `Persisting(n)` and an empty `Parsing(n)`
    /// continue to `Fetching(n + 1)`, a bad parse retries `Fetching(n)`.
    pub fn can_transition_to(&self, next: WalkState) -> bool {
        use WalkState::*;

        match (*self, next) {
            (Resuming(a), Fetching(b)) => a == b,
            (Resuming(_), StoppedSuccess | StoppedFailure) => true,
            (Fetching(a), Parsing(b)) => a == b,
            (Fetching(_), StoppedSuccess | StoppedFailure) => true,
            (Parsing(a), Persisting(b)) => a == b,
            (Parsing(a), Fetching(b)) => b == a || b == a + 1,
            (Parsing(_), StoppedSuccess | StoppedFailure) => true,
            (Persisting(a), Fetching(b)) => b == a + 1,
            (Persisting(_), StoppedSuccess | StoppedFailure) => true,
            _ => false,
        }
    }
}

impl fmt::Display for WalkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resuming(p) => write!(f, "resuming(page {})", p),
            Self::Fetching(p) => write!(f, "fetching(page {})", p),
            Self::Parsing(p) => write!(f, "parsing(page {})", p),
            Self::Persisting(p) => write!(f, "persisting(page {})", p),
            Self::StoppedSuccess => write!(f, "stopped(success)"),
            Self::StoppedFailure => write!(f, "stopped(failure)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(!WalkState::Resuming(0).is_terminal());
        assert!(!WalkState::Fetching(3).is_terminal());
        assert!(!WalkState::Parsing(3).is_terminal());
        assert!(!WalkState::Persisting(3).is_terminal());

        assert!(WalkState::StoppedSuccess.is_terminal());
        assert!(WalkState::StoppedFailure.is_terminal());
    }

    #[test]
    fn test_page() {
        assert_eq!(WalkState::Resuming(4).page(), Some(4));
        assert_eq!(WalkState::Persisting(9).page(), Some(9));
        assert_eq!(WalkState::StoppedSuccess.page(), None);
    }

    #[test]
    fn test_forward_transitions() {
        assert!(WalkState::Resuming(2).can_transition_to(WalkState::Fetching(2)));
        assert!(WalkState::Fetching(2).can_transition_to(WalkState::Parsing(2)));
        assert!(WalkState::Parsing(2).can_transition_to(WalkState::Persisting(2)));
        assert!(WalkState::Persisting(2).can_transition_to(WalkState::Fetching(3)));
    }

    #[test]
    fn test_empty_page_and_parse_retry_transitions() {
        // Empty page skips persistence
        assert!(WalkState::Parsing(2).can_transition_to(WalkState::Fetching(3)));
        // Unparseable page is fetched again
        assert!(WalkState::Parsing(2).can_transition_to(WalkState::Fetching(2)));
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!WalkState::Resuming(2).can_transition_to(WalkState::Fetching(3)));
        assert!(!WalkState::Fetching(2).can_transition_to(WalkState::Persisting(2)));
        assert!(!WalkState::Persisting(3).can_transition_to(WalkState::Fetching(3)));
        assert!(!WalkState::Persisting(3).can_transition_to(WalkState::Fetching(2)));
        assert!(!WalkState::StoppedSuccess.can_transition_to(WalkState::Fetching(0)));
        assert!(!WalkState::StoppedFailure.can_transition_to(WalkState::Resuming(0)));
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", WalkState::Fetching(7)), "fetching(page 7)");
        assert_eq!(format!("{}", WalkState::StoppedSuccess), "stopped(success)");
    }
}
