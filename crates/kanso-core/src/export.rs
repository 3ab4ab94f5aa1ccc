use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where an exportable event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSource {
    Task,
    TimeBlock,
    FocusSession,
}

impl EventSource {
    /// iCalendar CATEGORIES value for this source.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Task => "Task",
            Self::FocusSession => "Focus Session",
            Self::TimeBlock => "Time Block",
        }
    }
}

/// A calendar event assembled for export. Computed on demand, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportableEvent {
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub source: EventSource,
    pub source_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(EventSource::Task.category(), "Task");
        assert_eq!(EventSource::TimeBlock.category(), "Time Block");
        assert_eq!(EventSource::FocusSession.category(), "Focus Session");
    }
}
