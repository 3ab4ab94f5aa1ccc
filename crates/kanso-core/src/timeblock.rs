use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::KansoError;

/// A time-blocked calendar entry.
///
/// Blocks are half-open intervals `[start_time, end_time)`; adjacent blocks
/// sharing an endpoint do not overlap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeBlock {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub color: Option<String>,
    /// Ids of tasks linked to this block. Order is not meaningful.
    pub task_ids: Vec<i64>,
}

/// Time block that has not been persisted yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTimeBlock {
    pub user_id: i64,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub color: Option<String>,
}

/// Partial block update. `None` leaves a field unchanged; empty strings
/// are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimeBlockUpdate {
    pub title: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub color: Option<String>,
}

/// Validate that an interval's end is strictly after its start.
///
/// Checked at the call boundary, not inside the overlap query.
pub fn check_range(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), KansoError> {
    if end <= start {
        return Err(KansoError::InvalidRange(
            "end time must be after start time".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_check_range_accepts_valid() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
        assert!(check_range(start, end).is_ok());
    }

    #[test]
    fn test_check_range_rejects_equal_and_inverted() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        assert!(matches!(
            check_range(start, start),
            Err(KansoError::InvalidRange(_))
        ));
        let earlier = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        assert!(matches!(
            check_range(start, earlier),
            Err(KansoError::InvalidRange(_))
        ));
    }
}
