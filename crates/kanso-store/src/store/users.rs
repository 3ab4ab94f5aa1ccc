//! Account rows.

use super::Store;
use chrono::{DateTime, Utc};
use kanso_core::error::KansoError;
use kanso_core::user::User;

type UserRow = (i64, String, String, Option<String>, DateTime<Utc>);

fn user_from_row(row: UserRow) -> User {
    let (id, username, email, display_name, created_at) = row;
    User {
        id,
        username,
        email,
        display_name,
        created_at,
    }
}

impl Store {
    /// Create a user. Usernames and emails are unique.
    pub async fn create_user(&self, username: &str, email: &str) -> Result<User, KansoError> {
        let now = Utc::now();
        let result = sqlx::query("INSERT INTO users (username, email, created_at) VALUES (?, ?, ?)")
            .bind(username)
            .bind(email)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| KansoError::Storage(format!("create user failed: {e}")))?;

        Ok(User {
            id: result.last_insert_rowid(),
            username: username.to_string(),
            email: email.to_string(),
            display_name: None,
            created_at: now,
        })
    }

    pub async fn find_user(&self, id: i64) -> Result<Option<User>, KansoError> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, username, email, display_name, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| KansoError::Storage(format!("find user failed: {e}")))?;

        Ok(row.map(user_from_row))
    }

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, KansoError> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, username, email, display_name, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| KansoError::Storage(format!("find user by username failed: {e}")))?;

        Ok(row.map(user_from_row))
    }
}
