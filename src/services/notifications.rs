//! Notification persistence and real-time dispatch.

use kanso_core::error::KansoError;
use kanso_core::notification::{Notification, NotificationKind};
use kanso_core::task::Task;
use kanso_core::traits::Transport;
use kanso_realtime::events::{
    NotificationPayload, UnreadCountPayload, NEW_NOTIFICATION, UNREAD_COUNT_UPDATED,
};
use kanso_realtime::ConnectionRegistry;
use kanso_store::Store;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

/// Notifications returned per listing when the caller gives no limit.
const DEFAULT_LIMIT: i64 = 50;

/// Creates notifications and pushes them to the owner's live connections.
///
/// Every push is fire-and-forget: a transport failure is logged and the
/// business operation still succeeds. When the owner is offline nothing
/// is pushed at all.
#[derive(Clone)]
pub struct NotificationService {
    store: Store,
    registry: ConnectionRegistry,
    transport: Arc<dyn Transport>,
}

impl NotificationService {
    pub fn new(store: Store, registry: ConnectionRegistry, transport: Arc<dyn Transport>) -> Self {
        Self {
            store,
            registry,
            transport,
        }
    }

    /// Persist a notification, then push the notification followed by the
    /// fresh unread count to the owner's connections.
    pub async fn create(
        &self,
        user_id: i64,
        kind: NotificationKind,
        message: &str,
        related_entity_id: Option<&str>,
    ) -> Result<Notification, KansoError> {
        let notification = self
            .store
            .create_notification(user_id, kind, message, related_entity_id)
            .await?;

        let connections = self.registry.connections_for(user_id).await;
        if !connections.is_empty() {
            let unread_count = self.store.unread_count(user_id).await?;
            self.push(
                &connections,
                NEW_NOTIFICATION,
                &NotificationPayload::from(&notification),
            )
            .await;
            self.push(
                &connections,
                UNREAD_COUNT_UPDATED,
                &UnreadCountPayload { unread_count },
            )
            .await;
        }

        Ok(notification)
    }

    /// Reminder for a task, e.g. `Reminder: 'Water plants' due Mar 10, 2025`.
    pub async fn task_reminder(&self, user_id: i64, task: &Task) -> Result<Notification, KansoError> {
        let due_text = match task.due_date {
            Some(due) => format!(" due {}", due.format("%b %d, %Y")),
            None => String::new(),
        };
        self.create(
            user_id,
            NotificationKind::TaskReminder,
            &format!("Reminder: '{}'{due_text}", task.title),
            Some(&task.id.to_string()),
        )
        .await
    }

    pub async fn friend_request(
        &self,
        user_id: i64,
        friendship_id: i64,
    ) -> Result<Notification, KansoError> {
        self.create(
            user_id,
            NotificationKind::FriendRequest,
            "You have received a friend request",
            Some(&friendship_id.to_string()),
        )
        .await
    }

    pub async fn friend_accepted(
        &self,
        user_id: i64,
        friendship_id: i64,
    ) -> Result<Notification, KansoError> {
        self.create(
            user_id,
            NotificationKind::FriendAccepted,
            "Your friend request has been accepted",
            Some(&friendship_id.to_string()),
        )
        .await
    }

    /// Newest first, capped at `limit` (default 50).
    pub async fn list(
        &self,
        user_id: i64,
        unread_only: bool,
        limit: Option<i64>,
    ) -> Result<Vec<Notification>, KansoError> {
        self.store
            .notifications_for_user(user_id, unread_only, limit.unwrap_or(DEFAULT_LIMIT))
            .await
    }

    pub async fn unread_count(&self, user_id: i64) -> Result<i64, KansoError> {
        self.store.unread_count(user_id).await
    }

    /// Mark one notification read. Re-marking a read notification is a
    /// no-op and pushes nothing.
    pub async fn mark_read(&self, user_id: i64, id: i64) -> Result<(), KansoError> {
        let notification = self.owned(user_id, id).await?;
        if notification.is_read {
            return Ok(());
        }
        self.store.mark_notification_read(id).await?;
        self.push_fresh_count(user_id).await?;
        Ok(())
    }

    /// Mark everything read and push a count of zero.
    pub async fn mark_all_read(&self, user_id: i64) -> Result<(), KansoError> {
        self.store.mark_all_read(user_id).await?;
        self.push_count(user_id, 0).await;
        Ok(())
    }

    /// Delete one notification; the fresh count is pushed only when the
    /// deleted notification was still unread.
    pub async fn delete(&self, user_id: i64, id: i64) -> Result<(), KansoError> {
        let notification = self.owned(user_id, id).await?;
        self.store.delete_notification(id).await?;
        if !notification.is_read {
            self.push_fresh_count(user_id).await?;
        }
        Ok(())
    }

    /// Delete read notifications, or all of them when `read_only` is false.
    /// Clearing everything pushes a count of zero; clearing only read
    /// notifications cannot change the count, so nothing is pushed.
    pub async fn clear_all(&self, user_id: i64, read_only: bool) -> Result<(), KansoError> {
        self.store.delete_all_notifications(user_id, read_only).await?;
        if !read_only {
            self.push_count(user_id, 0).await;
        }
        Ok(())
    }

    async fn owned(&self, user_id: i64, id: i64) -> Result<Notification, KansoError> {
        let notification = self
            .store
            .find_notification(id)
            .await?
            .ok_or_else(|| KansoError::NotFound(format!("notification {id}")))?;
        if notification.user_id != user_id {
            return Err(KansoError::Unauthorized(
                "you can only manage your own notifications".to_string(),
            ));
        }
        Ok(notification)
    }

    async fn push_fresh_count(&self, user_id: i64) -> Result<(), KansoError> {
        let unread_count = self.store.unread_count(user_id).await?;
        self.push_count(user_id, unread_count).await;
        Ok(())
    }

    async fn push_count(&self, user_id: i64, unread_count: i64) {
        let connections = self.registry.connections_for(user_id).await;
        if connections.is_empty() {
            return;
        }
        self.push(
            &connections,
            UNREAD_COUNT_UPDATED,
            &UnreadCountPayload { unread_count },
        )
        .await;
    }

    async fn push<T: Serialize>(&self, connections: &[String], event: &str, payload: &T) {
        let value = match serde_json::to_value(payload) {
            Ok(value) => value,
            Err(e) => {
                warn!("serializing {event} payload failed: {e}");
                return;
            }
        };
        if let Err(e) = self.transport.send(connections, event, value).await {
            warn!("pushing {event} failed: {e}");
        }
    }
}
