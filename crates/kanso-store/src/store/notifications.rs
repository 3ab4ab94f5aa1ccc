//! Notification rows and unread counts.

use super::Store;
use chrono::{DateTime, Utc};
use kanso_core::error::KansoError;
use kanso_core::notification::{Notification, NotificationKind};

type NotificationRow = (i64, i64, String, String, Option<String>, bool, DateTime<Utc>);

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, kind, message, related_entity_id, is_read, created_at";

fn notification_from_row(row: NotificationRow) -> Result<Notification, KansoError> {
    let (id, user_id, kind, message, related_entity_id, is_read, created_at) = row;
    Ok(Notification {
        id,
        user_id,
        kind: kind.parse()?,
        message,
        related_entity_id,
        is_read,
        created_at,
    })
}

impl Store {
    /// Insert a notification. New rows are always unread.
    pub async fn create_notification(
        &self,
        user_id: i64,
        kind: NotificationKind,
        message: &str,
        related_entity_id: Option<&str>,
    ) -> Result<Notification, KansoError> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO notifications (user_id, kind, message, related_entity_id, is_read, created_at) \
             VALUES (?, ?, ?, ?, 0, ?)",
        )
        .bind(user_id)
        .bind(kind.as_str())
        .bind(message)
        .bind(related_entity_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| KansoError::Storage(format!("create notification failed: {e}")))?;

        Ok(Notification {
            id: result.last_insert_rowid(),
            user_id,
            kind,
            message: message.to_string(),
            related_entity_id: related_entity_id.map(str::to_string),
            is_read: false,
            created_at: now,
        })
    }

    pub async fn find_notification(&self, id: i64) -> Result<Option<Notification>, KansoError> {
        let row: Option<NotificationRow> = sqlx::query_as(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| KansoError::Storage(format!("find notification failed: {e}")))?;

        row.map(notification_from_row).transpose()
    }

    /// Newest first, capped at `limit`.
    pub async fn notifications_for_user(
        &self,
        user_id: i64,
        unread_only: bool,
        limit: i64,
    ) -> Result<Vec<Notification>, KansoError> {
        let rows: Vec<NotificationRow> = if unread_only {
            sqlx::query_as(&format!(
                "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
                 WHERE user_id = ? AND is_read = 0 \
                 ORDER BY datetime(created_at) DESC, id DESC LIMIT ?"
            ))
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| KansoError::Storage(format!("list notifications failed: {e}")))?
        } else {
            sqlx::query_as(&format!(
                "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
                 WHERE user_id = ? \
                 ORDER BY datetime(created_at) DESC, id DESC LIMIT ?"
            ))
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| KansoError::Storage(format!("list notifications failed: {e}")))?
        };

        rows.into_iter().map(notification_from_row).collect()
    }

    pub async fn unread_count(&self, user_id: i64) -> Result<i64, KansoError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND is_read = 0",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| KansoError::Storage(format!("unread count failed: {e}")))?;

        Ok(count)
    }

    pub async fn mark_notification_read(&self, id: i64) -> Result<(), KansoError> {
        let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| KansoError::Storage(format!("mark read failed: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(KansoError::NotFound(format!("notification {id}")));
        }
        Ok(())
    }

    pub async fn mark_all_read(&self, user_id: i64) -> Result<(), KansoError> {
        sqlx::query("UPDATE notifications SET is_read = 1 WHERE user_id = ? AND is_read = 0")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| KansoError::Storage(format!("mark all read failed: {e}")))?;
        Ok(())
    }

    pub async fn delete_notification(&self, id: i64) -> Result<(), KansoError> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| KansoError::Storage(format!("delete notification failed: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(KansoError::NotFound(format!("notification {id}")));
        }
        Ok(())
    }

    /// Bulk delete. With `read_only` set, unread rows are kept.
    pub async fn delete_all_notifications(
        &self,
        user_id: i64,
        read_only: bool,
    ) -> Result<(), KansoError> {
        if read_only {
            sqlx::query("DELETE FROM notifications WHERE user_id = ? AND is_read = 1")
                .bind(user_id)
                .execute(&self.pool)
                .await
                .map_err(|e| KansoError::Storage(format!("clear notifications failed: {e}")))?;
        } else {
            sqlx::query("DELETE FROM notifications WHERE user_id = ?")
                .bind(user_id)
                .execute(&self.pool)
                .await
                .map_err(|e| KansoError::Storage(format!("clear notifications failed: {e}")))?;
        }
        Ok(())
    }
}
