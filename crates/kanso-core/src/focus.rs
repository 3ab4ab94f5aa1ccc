use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::KansoError;

/// Mode a focus session runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FocusMode {
    DeepWork,
    Pomodoro,
    Meditation,
}

impl FocusMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DeepWork => "DEEP_WORK",
            Self::Pomodoro => "POMODORO",
            Self::Meditation => "MEDITATION",
        }
    }
}

impl fmt::Display for FocusMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FocusMode {
    type Err = KansoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DEEP_WORK" => Ok(Self::DeepWork),
            "POMODORO" => Ok(Self::Pomodoro),
            "MEDITATION" => Ok(Self::Meditation),
            _ => Err(KansoError::UnknownVariant {
                kind: "focus mode",
                value: s.to_string(),
            }),
        }
    }
}

/// A focus session. Open while `end_time` is unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FocusSession {
    pub id: i64,
    pub user_id: i64,
    pub mode: FocusMode,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Whole minutes, rounded, set when the session ends.
    pub duration_minutes: Option<i64>,
}

/// Per-mode aggregate for focus statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModeStat {
    pub mode: FocusMode,
    pub sessions: i64,
    pub minutes: i64,
}

/// Per-day aggregate for focus statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyStat {
    pub date: NaiveDate,
    pub sessions: i64,
    pub minutes: i64,
}

/// Aggregate focus statistics over a date range.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FocusStats {
    pub total_sessions: i64,
    pub total_minutes: i64,
    pub by_mode: Vec<ModeStat>,
    /// Ordered by date ascending.
    pub daily: Vec<DailyStat>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_round_trip() {
        for m in [FocusMode::DeepWork, FocusMode::Pomodoro, FocusMode::Meditation] {
            assert_eq!(m.as_str().parse::<FocusMode>().unwrap(), m);
        }
    }

    #[test]
    fn test_mode_parse_case_insensitive() {
        assert_eq!("deep_work".parse::<FocusMode>().unwrap(), FocusMode::DeepWork);
    }
}
