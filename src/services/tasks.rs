//! Task CRUD, completion, recurrence derivation, and reminders.

use chrono::{DateTime, Duration, Utc};
use kanso_core::error::KansoError;
use kanso_core::recurrence::{self, check_interval};
use kanso_core::task::{NewRecurrence, NewTask, RecurrenceUpdate, Task, TaskStatus, TaskUpdate};
use kanso_store::Store;
use tracing::{info, warn};

use super::NotificationService;

/// Task operations for one authenticated user at a time.
#[derive(Clone)]
pub struct TaskService {
    store: Store,
    notifications: NotificationService,
    /// Tasks due within this many hours get their reminder immediately.
    due_soon_hours: i64,
}

impl TaskService {
    pub fn new(store: Store, notifications: NotificationService, due_soon_hours: i64) -> Self {
        Self {
            store,
            notifications,
            due_soon_hours,
        }
    }

    /// Create a task. Status always starts at TODO regardless of input,
    /// and a due date within the reminder window triggers a reminder now.
    pub async fn create(&self, mut new: NewTask) -> Result<Task, KansoError> {
        if let Some(rule) = &new.recurrence {
            check_interval(rule.interval)?;
        }
        new.status = TaskStatus::Todo;

        let task = self.store.create_task(&new).await?;
        if task.due_date.is_some() {
            self.evaluate_reminder(&task).await?;
        }
        Ok(task)
    }

    pub async fn get(&self, user_id: i64, id: i64) -> Result<Task, KansoError> {
        let task = self
            .store
            .find_task(id)
            .await?
            .ok_or_else(|| KansoError::NotFound(format!("task {id}")))?;
        if task.user_id != user_id {
            return Err(KansoError::Unauthorized(
                "you do not own this task".to_string(),
            ));
        }
        Ok(task)
    }

    /// All of the user's tasks, newest first.
    pub async fn list(&self, user_id: i64) -> Result<Vec<Task>, KansoError> {
        self.store.tasks_for_user(user_id).await
    }

    /// Apply a partial update.
    ///
    /// Moving into COMPLETED stamps `completed_at`, and for a recurring
    /// task derives and persists the next occurrence; moving out of
    /// COMPLETED clears the completion state. A changed due date
    /// re-evaluates the reminder.
    pub async fn update(&self, user_id: i64, id: i64, update: TaskUpdate) -> Result<Task, KansoError> {
        let mut task = self.get(user_id, id).await?;

        if let Some(title) = update.title {
            if !title.is_empty() {
                task.title = title;
            }
        }
        if let Some(description) = update.description {
            task.description = Some(description);
        }
        if let Some(priority) = update.priority {
            task.priority = priority;
        }

        let mut completed_now = false;
        if let Some(status) = update.status {
            let old = task.status;
            task.status = status;
            if old != TaskStatus::Completed && status == TaskStatus::Completed {
                task.is_completed = true;
                task.completed_at = Some(Utc::now());
                completed_now = true;
            } else if old == TaskStatus::Completed && status != TaskStatus::Completed {
                task.is_completed = false;
                task.completed_at = None;
            }
        }

        if completed_now && task.recurrence.is_some() {
            // An expired or malformed rule never blocks the completion.
            if let Err(e) = self.create_next_occurrence(&task, Utc::now()).await {
                warn!("no next occurrence for task {}: {e}", task.id);
            }
        }

        let mut due_changed = false;
        if let Some(due) = update.due_date {
            due_changed = task.due_date != Some(due);
            task.due_date = Some(due);
        }

        if let Some(rule_update) = update.recurrence {
            self.merge_recurrence(&mut task, rule_update).await?;
        }

        self.store.update_task(&task).await?;

        if due_changed {
            self.evaluate_reminder(&task).await?;
        }

        Ok(task)
    }

    pub async fn delete(&self, user_id: i64, id: i64) -> Result<(), KansoError> {
        let task = self.get(user_id, id).await?;
        self.store.delete_task(task.id).await
    }

    /// Derive and persist the successor of a completed recurring task.
    /// The new task gets a detached copy of the rule and its own reminder
    /// evaluation.
    pub async fn create_next_occurrence(
        &self,
        completed: &Task,
        now: DateTime<Utc>,
    ) -> Result<Task, KansoError> {
        let next = recurrence::next_occurrence(completed, now)?;
        let created = self.store.create_task(&next).await?;
        info!(
            "task {} recurred into task {} (due {:?})",
            completed.id, created.id, created.due_date
        );
        if created.due_date.is_some() {
            self.evaluate_reminder(&created).await?;
        }
        Ok(created)
    }

    pub async fn link_time_block(
        &self,
        user_id: i64,
        task_id: i64,
        block_id: i64,
    ) -> Result<(), KansoError> {
        self.check_link_pair(user_id, task_id, block_id).await?;
        self.store.link_task(block_id, task_id).await
    }

    pub async fn unlink_time_block(
        &self,
        user_id: i64,
        task_id: i64,
        block_id: i64,
    ) -> Result<(), KansoError> {
        self.check_link_pair(user_id, task_id, block_id).await?;
        self.store.unlink_task(block_id, task_id).await
    }

    /// Both sides of a link must exist and belong to the caller.
    async fn check_link_pair(
        &self,
        user_id: i64,
        task_id: i64,
        block_id: i64,
    ) -> Result<(), KansoError> {
        let task = self
            .store
            .find_task(task_id)
            .await?
            .ok_or_else(|| KansoError::NotFound(format!("task {task_id}")))?;
        let block = self
            .store
            .find_time_block(block_id)
            .await?
            .ok_or_else(|| KansoError::NotFound(format!("time block {block_id}")))?;
        if task.user_id != user_id || block.user_id != user_id {
            return Err(KansoError::Unauthorized(
                "you do not own these items".to_string(),
            ));
        }
        Ok(())
    }

    /// Send the reminder now when the task is incomplete and due within
    /// the window. There is no background timer; later edits re-evaluate.
    async fn evaluate_reminder(&self, task: &Task) -> Result<(), KansoError> {
        let Some(due) = task.due_date else {
            return Ok(());
        };
        if task.is_completed {
            return Ok(());
        }
        if due < Utc::now() + Duration::hours(self.due_soon_hours) {
            self.notifications.task_reminder(task.user_id, task).await?;
        }
        Ok(())
    }

    async fn merge_recurrence(
        &self,
        task: &mut Task,
        update: RecurrenceUpdate,
    ) -> Result<(), KansoError> {
        match &task.recurrence {
            // A brand-new rule needs at least a pattern.
            None => {
                let Some(pattern) = update.pattern else {
                    return Ok(());
                };
                let interval = update.interval.unwrap_or(1);
                check_interval(interval)?;
                let rule = NewRecurrence {
                    pattern,
                    interval,
                    start_date: update.start_date.unwrap_or_else(Utc::now),
                    end_date: update.end_date,
                };
                task.recurrence = Some(self.store.upsert_recurrence(task.id, &rule).await?);
            }
            Some(existing) => {
                let mut rule = existing.to_new();
                if let Some(pattern) = update.pattern {
                    rule.pattern = pattern;
                }
                if let Some(interval) = update.interval {
                    check_interval(interval)?;
                    rule.interval = interval;
                }
                if let Some(start) = update.start_date {
                    rule.start_date = start;
                }
                // Assigned as given: None clears an existing end date.
                rule.end_date = update.end_date;
                task.recurrence = Some(self.store.upsert_recurrence(task.id, &rule).await?);
            }
        }
        Ok(())
    }
}
