//! Event names and payloads pushed over live connections.
//!
//! Payloads serialize with camelCase keys, matching what web clients
//! expect on the wire.

use chrono::{DateTime, Utc};
use kanso_core::focus::{FocusMode, FocusSession};
use kanso_core::notification::{Notification, NotificationKind};
use serde::Serialize;

/// A new notification was created for the receiving user.
pub const NEW_NOTIFICATION: &str = "NewNotification";
/// The receiving user's unread notification count changed.
pub const UNREAD_COUNT_UPDATED: &str = "UnreadCountUpdated";
/// A focus session started.
pub const SESSION_STARTED: &str = "SessionStarted";
/// A focus session ended.
pub const SESSION_ENDED: &str = "SessionEnded";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub id: i64,
    pub kind: NotificationKind,
    pub message: String,
    pub related_entity_id: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Notification> for NotificationPayload {
    fn from(notification: &Notification) -> Self {
        Self {
            id: notification.id,
            kind: notification.kind,
            message: notification.message.clone(),
            related_entity_id: notification.related_entity_id.clone(),
            is_read: notification.is_read,
            created_at: notification.created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCountPayload {
    pub unread_count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPayload {
    pub id: i64,
    pub mode: FocusMode,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i64>,
}

impl From<&FocusSession> for SessionPayload {
    fn from(session: &FocusSession) -> Self {
        Self {
            id: session.id,
            mode: session.mode,
            start_time: session.start_time,
            end_time: session.end_time,
            duration_minutes: session.duration_minutes,
        }
    }
}
