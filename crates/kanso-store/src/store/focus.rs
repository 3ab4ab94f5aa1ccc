//! Focus session rows and aggregates.

use super::Store;
use chrono::{DateTime, Utc};
use kanso_core::error::KansoError;
use kanso_core::focus::{DailyStat, FocusMode, FocusSession, FocusStats, ModeStat};

type SessionRow = (
    i64,
    i64,
    String,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
    Option<i64>,
);

const SESSION_COLUMNS: &str = "id, user_id, mode, start_time, end_time, duration_minutes";

fn session_from_row(row: SessionRow) -> Result<FocusSession, KansoError> {
    let (id, user_id, mode, start_time, end_time, duration_minutes) = row;
    Ok(FocusSession {
        id,
        user_id,
        mode: mode.parse()?,
        start_time,
        end_time,
        duration_minutes,
    })
}

impl Store {
    pub async fn create_focus_session(
        &self,
        user_id: i64,
        mode: FocusMode,
        start_time: DateTime<Utc>,
    ) -> Result<FocusSession, KansoError> {
        let result = sqlx::query(
            "INSERT INTO focus_sessions (user_id, mode, start_time) VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(mode.as_str())
        .bind(start_time)
        .execute(&self.pool)
        .await
        .map_err(|e| KansoError::Storage(format!("create focus session failed: {e}")))?;

        Ok(FocusSession {
            id: result.last_insert_rowid(),
            user_id,
            mode,
            start_time,
            end_time: None,
            duration_minutes: None,
        })
    }

    pub async fn find_focus_session(&self, id: i64) -> Result<Option<FocusSession>, KansoError> {
        let row: Option<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SESSION_COLUMNS} FROM focus_sessions WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| KansoError::Storage(format!("find focus session failed: {e}")))?;

        row.map(session_from_row).transpose()
    }

    /// The user's open session, if one exists.
    pub async fn active_session_for_user(
        &self,
        user_id: i64,
    ) -> Result<Option<FocusSession>, KansoError> {
        let row: Option<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SESSION_COLUMNS} FROM focus_sessions \
             WHERE user_id = ? AND end_time IS NULL \
             ORDER BY datetime(start_time) DESC LIMIT 1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| KansoError::Storage(format!("find active session failed: {e}")))?;

        row.map(session_from_row).transpose()
    }

    pub async fn end_focus_session(
        &self,
        id: i64,
        end_time: DateTime<Utc>,
        duration_minutes: i64,
    ) -> Result<(), KansoError> {
        let result = sqlx::query(
            "UPDATE focus_sessions SET end_time = ?, duration_minutes = ? WHERE id = ?",
        )
        .bind(end_time)
        .bind(duration_minutes)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| KansoError::Storage(format!("end focus session failed: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(KansoError::NotFound(format!("focus session {id}")));
        }
        Ok(())
    }

    /// Sessions intersecting `[start, end]`, latest first. Open sessions
    /// started before the window are included.
    pub async fn sessions_for_user(
        &self,
        user_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<FocusSession>, KansoError> {
        let rows: Vec<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SESSION_COLUMNS} FROM focus_sessions \
             WHERE user_id = ? \
             AND ((datetime(start_time) >= datetime(?) AND datetime(start_time) <= datetime(?)) \
               OR (datetime(end_time) >= datetime(?) AND datetime(end_time) <= datetime(?)) \
               OR (datetime(start_time) <= datetime(?) AND datetime(end_time) >= datetime(?)) \
               OR (datetime(start_time) <= datetime(?) AND end_time IS NULL)) \
             ORDER BY datetime(start_time) DESC"
        ))
        .bind(user_id)
        .bind(start)
        .bind(end)
        .bind(start)
        .bind(end)
        .bind(start)
        .bind(end)
        .bind(start)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| KansoError::Storage(format!("list focus sessions failed: {e}")))?;

        rows.into_iter().map(session_from_row).collect()
    }

    /// Aggregate completed-session statistics over `[start, end]`.
    pub async fn focus_stats(
        &self,
        user_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<FocusStats, KansoError> {
        let (total_sessions, total_minutes): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(duration_minutes), 0) FROM focus_sessions \
             WHERE user_id = ? AND end_time IS NOT NULL \
             AND datetime(start_time) >= datetime(?) AND datetime(start_time) <= datetime(?)",
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| KansoError::Storage(format!("focus totals failed: {e}")))?;

        let mode_rows: Vec<(String, i64, i64)> = sqlx::query_as(
            "SELECT mode, COUNT(*), COALESCE(SUM(duration_minutes), 0) FROM focus_sessions \
             WHERE user_id = ? AND end_time IS NOT NULL \
             AND datetime(start_time) >= datetime(?) AND datetime(start_time) <= datetime(?) \
             GROUP BY mode ORDER BY mode",
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| KansoError::Storage(format!("focus mode stats failed: {e}")))?;

        let daily_rows: Vec<(String, i64, i64)> = sqlx::query_as(
            "SELECT date(start_time), COUNT(*), COALESCE(SUM(duration_minutes), 0) \
             FROM focus_sessions \
             WHERE user_id = ? AND end_time IS NOT NULL \
             AND datetime(start_time) >= datetime(?) AND datetime(start_time) <= datetime(?) \
             GROUP BY date(start_time) ORDER BY date(start_time)",
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| KansoError::Storage(format!("focus daily stats failed: {e}")))?;

        let mut by_mode = Vec::with_capacity(mode_rows.len());
        for (mode, sessions, minutes) in mode_rows {
            by_mode.push(ModeStat {
                mode: mode.parse()?,
                sessions,
                minutes,
            });
        }

        let mut daily = Vec::with_capacity(daily_rows.len());
        for (date, sessions, minutes) in daily_rows {
            let date = date
                .parse()
                .map_err(|e| KansoError::Storage(format!("bad date from sqlite: {e}")))?;
            daily.push(DailyStat {
                date,
                sessions,
                minutes,
            });
        }

        Ok(FocusStats {
            total_sessions,
            total_minutes,
            by_mode,
            daily,
        })
    }
}
