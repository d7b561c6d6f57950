use crate::unit::{UnitKey, WorkUnit};

/// An (eventId, categoryId) pair resolved through the venue map lookup
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventCategory {
    pub event_id: String,
    pub category_id: String,
}

impl EventCategory {
    pub fn new(event_id: impl Into<String>, category_id: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
            category_id: category_id.into(),
        }
    }

    /// Both ids must be non-empty integers
    pub fn is_valid(&self) -> bool {
        !self.event_id.is_empty()
            && !self.category_id.is_empty()
            && self.event_id.parse::<i64>().is_ok()
            && self.category_id.parse::<i64>().is_ok()
    }
}

impl WorkUnit for EventCategory {
    fn key(&self) -> UnitKey {
        UnitKey::new(self.event_id.clone(), self.category_id.clone())
    }

    fn label(&self) -> String {
        format!("{}_{}_venue", self.event_id, self.category_id)
    }
}
