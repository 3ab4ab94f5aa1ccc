//! Task CRUD and recurrence rule rows.

use super::Store;
use chrono::{DateTime, Utc};
use kanso_core::error::KansoError;
use kanso_core::task::{NewRecurrence, NewTask, RecurrenceRule, Task};
use std::collections::HashMap;

type TaskRow = (
    i64,
    i64,
    String,
    Option<String>,
    String,
    String,
    Option<DateTime<Utc>>,
    bool,
    Option<DateTime<Utc>>,
    DateTime<Utc>,
);

type RuleRow = (i64, i64, String, i64, DateTime<Utc>, Option<DateTime<Utc>>);

const TASK_COLUMNS: &str = "id, user_id, title, description, priority, status, due_date, \
                            is_completed, completed_at, created_at";

fn task_from_row(row: TaskRow, recurrence: Option<RecurrenceRule>) -> Result<Task, KansoError> {
    let (id, user_id, title, description, priority, status, due_date, is_completed, completed_at, created_at) =
        row;
    Ok(Task {
        id,
        user_id,
        title,
        description,
        priority: priority.parse()?,
        status: status.parse()?,
        due_date,
        is_completed,
        completed_at,
        created_at,
        recurrence,
    })
}

fn rule_from_row(row: RuleRow) -> Result<RecurrenceRule, KansoError> {
    let (id, task_id, pattern, interval, start_date, end_date) = row;
    Ok(RecurrenceRule {
        id,
        task_id,
        pattern: pattern.parse()?,
        interval: interval as i32,
        start_date,
        end_date,
    })
}

impl Store {
    /// Create a task, inserting its recurrence rule row when present.
    pub async fn create_task(&self, new: &NewTask) -> Result<Task, KansoError> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO tasks (user_id, title, description, priority, status, due_date, \
             is_completed, completed_at, created_at) VALUES (?, ?, ?, ?, ?, ?, 0, NULL, ?)",
        )
        .bind(new.user_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.priority.as_str())
        .bind(new.status.as_str())
        .bind(new.due_date)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| KansoError::Storage(format!("create task failed: {e}")))?;

        let task_id = result.last_insert_rowid();

        let recurrence = match &new.recurrence {
            Some(rule) => Some(self.upsert_recurrence(task_id, rule).await?),
            None => None,
        };

        Ok(Task {
            id: task_id,
            user_id: new.user_id,
            title: new.title.clone(),
            description: new.description.clone(),
            priority: new.priority,
            status: new.status,
            due_date: new.due_date,
            is_completed: false,
            completed_at: None,
            created_at: now,
            recurrence,
        })
    }

    pub async fn find_task(&self, id: i64) -> Result<Option<Task>, KansoError> {
        let row: Option<TaskRow> =
            sqlx::query_as(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| KansoError::Storage(format!("find task failed: {e}")))?;

        match row {
            Some(row) => {
                let rule = self.find_recurrence(id).await?;
                Ok(Some(task_from_row(row, rule)?))
            }
            None => Ok(None),
        }
    }

    /// All tasks for a user, newest first, with recurrence rules attached.
    pub async fn tasks_for_user(&self, user_id: i64) -> Result<Vec<Task>, KansoError> {
        let rows: Vec<TaskRow> = sqlx::query_as(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = ? ORDER BY datetime(created_at) DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| KansoError::Storage(format!("list tasks failed: {e}")))?;

        let mut rules = self.rules_for_user(user_id).await?;
        rows.into_iter()
            .map(|row| {
                let rule = rules.remove(&row.0);
                task_from_row(row, rule)
            })
            .collect()
    }

    /// Incomplete tasks with a due date inside `[start, end]`, with rules
    /// attached.
    pub async fn due_tasks_for_user(
        &self,
        user_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Task>, KansoError> {
        let rows: Vec<TaskRow> = sqlx::query_as(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks \
             WHERE user_id = ? AND due_date IS NOT NULL AND is_completed = 0 \
             AND datetime(due_date) >= datetime(?) AND datetime(due_date) <= datetime(?) \
             ORDER BY datetime(due_date) ASC"
        ))
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| KansoError::Storage(format!("list due tasks failed: {e}")))?;

        let mut rules = self.rules_for_user(user_id).await?;
        rows.into_iter()
            .map(|row| {
                let rule = rules.remove(&row.0);
                task_from_row(row, rule)
            })
            .collect()
    }

    /// Update a task row. The recurrence rule is managed separately.
    pub async fn update_task(&self, task: &Task) -> Result<(), KansoError> {
        let result = sqlx::query(
            "UPDATE tasks SET title = ?, description = ?, priority = ?, status = ?, \
             due_date = ?, is_completed = ?, completed_at = ? WHERE id = ?",
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.priority.as_str())
        .bind(task.status.as_str())
        .bind(task.due_date)
        .bind(task.is_completed)
        .bind(task.completed_at)
        .bind(task.id)
        .execute(&self.pool)
        .await
        .map_err(|e| KansoError::Storage(format!("update task failed: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(KansoError::NotFound(format!("task {}", task.id)));
        }
        Ok(())
    }

    pub async fn delete_task(&self, id: i64) -> Result<(), KansoError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| KansoError::Storage(format!("delete task failed: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(KansoError::NotFound(format!("task {id}")));
        }
        Ok(())
    }

    /// Insert or replace the recurrence rule for a task.
    pub async fn upsert_recurrence(
        &self,
        task_id: i64,
        rule: &NewRecurrence,
    ) -> Result<RecurrenceRule, KansoError> {
        sqlx::query(
            "INSERT INTO task_recurrences (task_id, pattern, interval, start_date, end_date) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(task_id) DO UPDATE SET pattern = excluded.pattern, \
             interval = excluded.interval, start_date = excluded.start_date, \
             end_date = excluded.end_date",
        )
        .bind(task_id)
        .bind(rule.pattern.as_str())
        .bind(i64::from(rule.interval))
        .bind(rule.start_date)
        .bind(rule.end_date)
        .execute(&self.pool)
        .await
        .map_err(|e| KansoError::Storage(format!("upsert recurrence failed: {e}")))?;

        self.find_recurrence(task_id)
            .await?
            .ok_or_else(|| KansoError::Storage(format!("recurrence for task {task_id} missing after upsert")))
    }

    pub async fn find_recurrence(&self, task_id: i64) -> Result<Option<RecurrenceRule>, KansoError> {
        let row: Option<RuleRow> = sqlx::query_as(
            "SELECT id, task_id, pattern, interval, start_date, end_date \
             FROM task_recurrences WHERE task_id = ?",
        )
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| KansoError::Storage(format!("find recurrence failed: {e}")))?;

        row.map(rule_from_row).transpose()
    }

    async fn rules_for_user(&self, user_id: i64) -> Result<HashMap<i64, RecurrenceRule>, KansoError> {
        let rows: Vec<RuleRow> = sqlx::query_as(
            "SELECT r.id, r.task_id, r.pattern, r.interval, r.start_date, r.end_date \
             FROM task_recurrences r JOIN tasks t ON t.id = r.task_id WHERE t.user_id = ?",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| KansoError::Storage(format!("list recurrences failed: {e}")))?;

        let mut map = HashMap::new();
        for row in rows {
            let rule = rule_from_row(row)?;
            map.insert(rule.task_id, rule);
        }
        Ok(map)
    }
}
