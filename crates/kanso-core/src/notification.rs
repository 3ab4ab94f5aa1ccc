use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::KansoError;

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    TaskReminder,
    FriendRequest,
    FriendAccepted,
    System,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TaskReminder => "TASK_REMINDER",
            Self::FriendRequest => "FRIEND_REQUEST",
            Self::FriendAccepted => "FRIEND_ACCEPTED",
            Self::System => "SYSTEM",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = KansoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TASK_REMINDER" => Ok(Self::TaskReminder),
            "FRIEND_REQUEST" => Ok(Self::FriendRequest),
            "FRIEND_ACCEPTED" => Ok(Self::FriendAccepted),
            "SYSTEM" => Ok(Self::System),
            _ => Err(KansoError::UnknownVariant {
                kind: "notification kind",
                value: s.to_string(),
            }),
        }
    }
}

/// A notification record.
///
/// Created unread; mutated only by mark-read and clear operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub kind: NotificationKind,
    pub message: String,
    /// Id of the entity this notification refers to, as opaque text.
    pub related_entity_id: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
