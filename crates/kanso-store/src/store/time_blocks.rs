//! Calendar blocks, task links, and the overlap query.

use super::Store;
use chrono::{DateTime, Utc};
use kanso_core::error::KansoError;
use kanso_core::timeblock::{NewTimeBlock, TimeBlock};

type BlockRow = (i64, i64, String, DateTime<Utc>, DateTime<Utc>, Option<String>);

impl Store {
    pub async fn create_time_block(&self, new: &NewTimeBlock) -> Result<TimeBlock, KansoError> {
        let result = sqlx::query(
            "INSERT INTO time_blocks (user_id, title, start_time, end_time, color) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(new.user_id)
        .bind(&new.title)
        .bind(new.start_time)
        .bind(new.end_time)
        .bind(&new.color)
        .execute(&self.pool)
        .await
        .map_err(|e| KansoError::Storage(format!("create time block failed: {e}")))?;

        Ok(TimeBlock {
            id: result.last_insert_rowid(),
            user_id: new.user_id,
            title: new.title.clone(),
            start_time: new.start_time,
            end_time: new.end_time,
            color: new.color.clone(),
            task_ids: Vec::new(),
        })
    }

    pub async fn find_time_block(&self, id: i64) -> Result<Option<TimeBlock>, KansoError> {
        let row: Option<BlockRow> = sqlx::query_as(
            "SELECT id, user_id, title, start_time, end_time, color FROM time_blocks WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| KansoError::Storage(format!("find time block failed: {e}")))?;

        match row {
            Some((id, user_id, title, start_time, end_time, color)) => {
                let task_ids = self.task_ids_for_block(id).await?;
                Ok(Some(TimeBlock {
                    id,
                    user_id,
                    title,
                    start_time,
                    end_time,
                    color,
                    task_ids,
                }))
            }
            None => Ok(None),
        }
    }

    /// Blocks intersecting `[start, end]`, earliest first.
    pub async fn time_blocks_for_user(
        &self,
        user_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TimeBlock>, KansoError> {
        let rows: Vec<BlockRow> = sqlx::query_as(
            "SELECT id, user_id, title, start_time, end_time, color FROM time_blocks \
             WHERE user_id = ? \
             AND ((datetime(start_time) >= datetime(?) AND datetime(start_time) <= datetime(?)) \
               OR (datetime(end_time) >= datetime(?) AND datetime(end_time) <= datetime(?)) \
               OR (datetime(start_time) <= datetime(?) AND datetime(end_time) >= datetime(?))) \
             ORDER BY datetime(start_time) ASC",
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .bind(start)
        .bind(end)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| KansoError::Storage(format!("list time blocks failed: {e}")))?;

        let mut blocks = Vec::with_capacity(rows.len());
        for (id, user_id, title, start_time, end_time, color) in rows {
            let task_ids = self.task_ids_for_block(id).await?;
            blocks.push(TimeBlock {
                id,
                user_id,
                title,
                start_time,
                end_time,
                color,
                task_ids,
            });
        }
        Ok(blocks)
    }

    /// Update a block's fields. Task links are managed separately.
    pub async fn update_time_block(&self, block: &TimeBlock) -> Result<(), KansoError> {
        let result = sqlx::query(
            "UPDATE time_blocks SET title = ?, start_time = ?, end_time = ?, color = ? \
             WHERE id = ?",
        )
        .bind(&block.title)
        .bind(block.start_time)
        .bind(block.end_time)
        .bind(&block.color)
        .bind(block.id)
        .execute(&self.pool)
        .await
        .map_err(|e| KansoError::Storage(format!("update time block failed: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(KansoError::NotFound(format!("time block {}", block.id)));
        }
        Ok(())
    }

    pub async fn delete_time_block(&self, id: i64) -> Result<(), KansoError> {
        let result = sqlx::query("DELETE FROM time_blocks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| KansoError::Storage(format!("delete time block failed: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(KansoError::NotFound(format!("time block {id}")));
        }
        Ok(())
    }

    /// Whether any of the user's blocks overlaps `[start, end)`.
    ///
    /// Half-open semantics: blocks that merely touch at an endpoint do not
    /// overlap. `exclude` skips one block id, for checking a block against
    /// its own proposed update.
    pub async fn has_overlapping_time_blocks(
        &self,
        user_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude: Option<i64>,
    ) -> Result<bool, KansoError> {
        let count: (i64,) = match exclude {
            Some(id) => sqlx::query_as(
                "SELECT COUNT(*) FROM time_blocks \
                 WHERE user_id = ? AND id <> ? \
                 AND NOT (datetime(end_time) <= datetime(?) OR datetime(start_time) >= datetime(?))",
            )
            .bind(user_id)
            .bind(id)
            .bind(start)
            .bind(end)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| KansoError::Storage(format!("overlap check failed: {e}")))?,
            None => sqlx::query_as(
                "SELECT COUNT(*) FROM time_blocks \
                 WHERE user_id = ? \
                 AND NOT (datetime(end_time) <= datetime(?) OR datetime(start_time) >= datetime(?))",
            )
            .bind(user_id)
            .bind(start)
            .bind(end)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| KansoError::Storage(format!("overlap check failed: {e}")))?,
        };

        Ok(count.0 > 0)
    }

    /// Link a task to a block. Idempotent.
    pub async fn link_task(&self, block_id: i64, task_id: i64) -> Result<(), KansoError> {
        sqlx::query("INSERT OR IGNORE INTO time_block_tasks (time_block_id, task_id) VALUES (?, ?)")
            .bind(block_id)
            .bind(task_id)
            .execute(&self.pool)
            .await
            .map_err(|e| KansoError::Storage(format!("link task failed: {e}")))?;
        Ok(())
    }

    /// Unlink a task from a block. Idempotent.
    pub async fn unlink_task(&self, block_id: i64, task_id: i64) -> Result<(), KansoError> {
        sqlx::query("DELETE FROM time_block_tasks WHERE time_block_id = ? AND task_id = ?")
            .bind(block_id)
            .bind(task_id)
            .execute(&self.pool)
            .await
            .map_err(|e| KansoError::Storage(format!("unlink task failed: {e}")))?;
        Ok(())
    }

    pub async fn task_ids_for_block(&self, block_id: i64) -> Result<Vec<i64>, KansoError> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT task_id FROM time_block_tasks WHERE time_block_id = ? ORDER BY task_id",
        )
        .bind(block_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| KansoError::Storage(format!("list block tasks failed: {e}")))?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
