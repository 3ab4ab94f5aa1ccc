//! Friendship rows, keyed by unordered user pair.

use super::Store;
use chrono::{DateTime, Utc};
use kanso_core::error::KansoError;
use kanso_core::friendship::{Friendship, FriendshipStats, FriendshipStatus};
use kanso_core::user::User;

type FriendshipRow = (i64, i64, i64, String, DateTime<Utc>, Option<DateTime<Utc>>);

const FRIENDSHIP_COLUMNS: &str =
    "id, requester_id, requestee_id, status, requested_at, accepted_at";

fn friendship_from_row(row: FriendshipRow) -> Result<Friendship, KansoError> {
    let (id, requester_id, requestee_id, status, requested_at, accepted_at) = row;
    Ok(Friendship {
        id,
        requester_id,
        requestee_id,
        status: status.parse()?,
        requested_at,
        accepted_at,
    })
}

impl Store {
    /// Insert a fresh pending row for the pair.
    ///
    /// The unique pair index rejects a second row for the same two users
    /// regardless of direction.
    pub async fn create_friendship(
        &self,
        requester_id: i64,
        requestee_id: i64,
    ) -> Result<Friendship, KansoError> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO friendships (requester_id, requestee_id, status, requested_at) \
             VALUES (?, ?, 'PENDING', ?)",
        )
        .bind(requester_id)
        .bind(requestee_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| KansoError::Storage(format!("create friendship failed: {e}")))?;

        Ok(Friendship {
            id: result.last_insert_rowid(),
            requester_id,
            requestee_id,
            status: FriendshipStatus::Pending,
            requested_at: now,
            accepted_at: None,
        })
    }

    pub async fn find_friendship(&self, id: i64) -> Result<Option<Friendship>, KansoError> {
        let row: Option<FriendshipRow> = sqlx::query_as(&format!(
            "SELECT {FRIENDSHIP_COLUMNS} FROM friendships WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| KansoError::Storage(format!("find friendship failed: {e}")))?;

        row.map(friendship_from_row).transpose()
    }

    /// The row for an unordered user pair, whichever direction it was sent.
    pub async fn friendship_between(
        &self,
        user_a: i64,
        user_b: i64,
    ) -> Result<Option<Friendship>, KansoError> {
        let row: Option<FriendshipRow> = sqlx::query_as(&format!(
            "SELECT {FRIENDSHIP_COLUMNS} FROM friendships \
             WHERE (requester_id = ? AND requestee_id = ?) \
                OR (requester_id = ? AND requestee_id = ?)"
        ))
        .bind(user_a)
        .bind(user_b)
        .bind(user_b)
        .bind(user_a)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| KansoError::Storage(format!("find pair friendship failed: {e}")))?;

        row.map(friendship_from_row).transpose()
    }

    /// Rows where the user is on either side, optionally filtered by status.
    pub async fn friendships_for_user(
        &self,
        user_id: i64,
        status: Option<FriendshipStatus>,
    ) -> Result<Vec<Friendship>, KansoError> {
        let rows: Vec<FriendshipRow> = match status {
            Some(status) => sqlx::query_as(&format!(
                "SELECT {FRIENDSHIP_COLUMNS} FROM friendships \
                 WHERE (requester_id = ? OR requestee_id = ?) AND status = ?"
            ))
            .bind(user_id)
            .bind(user_id)
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| KansoError::Storage(format!("list friendships failed: {e}")))?,
            None => sqlx::query_as(&format!(
                "SELECT {FRIENDSHIP_COLUMNS} FROM friendships \
                 WHERE requester_id = ? OR requestee_id = ?"
            ))
            .bind(user_id)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| KansoError::Storage(format!("list friendships failed: {e}")))?,
        };

        rows.into_iter().map(friendship_from_row).collect()
    }

    /// Pending rows where the user is the requestee.
    pub async fn incoming_requests(&self, user_id: i64) -> Result<Vec<Friendship>, KansoError> {
        let rows: Vec<FriendshipRow> = sqlx::query_as(&format!(
            "SELECT {FRIENDSHIP_COLUMNS} FROM friendships \
             WHERE requestee_id = ? AND status = 'PENDING'"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| KansoError::Storage(format!("list incoming requests failed: {e}")))?;

        rows.into_iter().map(friendship_from_row).collect()
    }

    /// Pending rows where the user is the requester.
    pub async fn outgoing_requests(&self, user_id: i64) -> Result<Vec<Friendship>, KansoError> {
        let rows: Vec<FriendshipRow> = sqlx::query_as(&format!(
            "SELECT {FRIENDSHIP_COLUMNS} FROM friendships \
             WHERE requester_id = ? AND status = 'PENDING'"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| KansoError::Storage(format!("list outgoing requests failed: {e}")))?;

        rows.into_iter().map(friendship_from_row).collect()
    }

    /// The other user of every accepted friendship.
    pub async fn friends_of(&self, user_id: i64) -> Result<Vec<User>, KansoError> {
        let rows: Vec<(i64, String, String, Option<String>, DateTime<Utc>)> = sqlx::query_as(
            "SELECT u.id, u.username, u.email, u.display_name, u.created_at \
             FROM users u \
             JOIN friendships f ON (u.id = f.requester_id OR u.id = f.requestee_id) \
             WHERE f.status = 'ACCEPTED' \
               AND (f.requester_id = ? OR f.requestee_id = ?) \
               AND u.id <> ? \
             ORDER BY u.username",
        )
        .bind(user_id)
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| KansoError::Storage(format!("list friends failed: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|(id, username, email, display_name, created_at)| User {
                id,
                username,
                email,
                display_name,
                created_at,
            })
            .collect())
    }

    /// Write back a row's status and timestamps.
    pub async fn update_friendship(&self, friendship: &Friendship) -> Result<(), KansoError> {
        let result = sqlx::query(
            "UPDATE friendships SET status = ?, requested_at = ?, accepted_at = ? WHERE id = ?",
        )
        .bind(friendship.status.as_str())
        .bind(friendship.requested_at)
        .bind(friendship.accepted_at)
        .bind(friendship.id)
        .execute(&self.pool)
        .await
        .map_err(|e| KansoError::Storage(format!("update friendship failed: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(KansoError::NotFound(format!("friendship {}", friendship.id)));
        }
        Ok(())
    }

    pub async fn delete_friendship(&self, id: i64) -> Result<(), KansoError> {
        let result = sqlx::query("DELETE FROM friendships WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| KansoError::Storage(format!("delete friendship failed: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(KansoError::NotFound(format!("friendship {id}")));
        }
        Ok(())
    }

    pub async fn friendship_stats(&self, user_id: i64) -> Result<FriendshipStats, KansoError> {
        let (total_friends,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM friendships \
             WHERE status = 'ACCEPTED' AND (requester_id = ? OR requestee_id = ?)",
        )
        .bind(user_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| KansoError::Storage(format!("friend count failed: {e}")))?;

        let (pending_incoming,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM friendships WHERE status = 'PENDING' AND requestee_id = ?",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| KansoError::Storage(format!("incoming count failed: {e}")))?;

        let (pending_outgoing,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM friendships WHERE status = 'PENDING' AND requester_id = ?",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| KansoError::Storage(format!("outgoing count failed: {e}")))?;

        Ok(FriendshipStats {
            total_friends,
            pending_incoming,
            pending_outgoing,
        })
    }
}
