use chrono::{DateTime, Duration, Months, Utc};

use crate::error::KansoError;
use crate::task::{NewTask, RecurrencePattern, RecurrenceRule, Task, TaskStatus};

/// Derive the next occurrence of a completed recurring task.
///
/// The next due date advances the original due date by exactly one rule
/// interval; `now` only gates the rule's end date. A task without a due
/// date yields a successor without one. The result carries a detached copy
/// of the rule, persisted as the new task's own row.
pub fn next_occurrence(task: &Task, now: DateTime<Utc>) -> Result<NewTask, KansoError> {
    let rule = task.recurrence.as_ref().ok_or(KansoError::NotRecurring)?;

    if let Some(end) = rule.end_date {
        if now > end {
            return Err(KansoError::RecurrenceExpired);
        }
    }
    check_interval(rule.interval)?;

    let due_date = match task.due_date {
        Some(due) => Some(advance(due, rule)?),
        None => None,
    };

    Ok(NewTask {
        user_id: task.user_id,
        title: task.title.clone(),
        description: task.description.clone(),
        priority: task.priority,
        status: TaskStatus::Todo,
        due_date,
        recurrence: Some(rule.to_new()),
    })
}

/// Validate a rule interval. A rule must advance by at least one step.
pub fn check_interval(interval: i32) -> Result<(), KansoError> {
    if interval < 1 {
        return Err(KansoError::InvalidRange(format!(
            "recurrence interval must be at least 1, got {interval}"
        )));
    }
    Ok(())
}

/// Advance a due date by one rule interval.
///
/// Month and year arithmetic clamps to the last day of the target month,
/// so Jan 31 + 1 month lands on Feb 28 (or 29).
fn advance(due: DateTime<Utc>, rule: &RecurrenceRule) -> Result<DateTime<Utc>, KansoError> {
    let interval = i64::from(rule.interval);
    let next = match rule.pattern {
        RecurrencePattern::Daily => due.checked_add_signed(Duration::days(interval)),
        RecurrencePattern::Weekly => due.checked_add_signed(Duration::days(7 * interval)),
        RecurrencePattern::Monthly => due.checked_add_months(Months::new(rule.interval as u32)),
        RecurrencePattern::Yearly => {
            due.checked_add_months(Months::new((rule.interval as u32).saturating_mul(12)))
        }
    };
    next.ok_or_else(|| KansoError::InvalidRange(format!("next due date out of range from {due}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskPriority;
    use chrono::TimeZone;

    fn recurring_task(
        pattern: RecurrencePattern,
        interval: i32,
        due: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Task {
        Task {
            id: 1,
            user_id: 10,
            title: "Water the plants".to_string(),
            description: Some("All of them".to_string()),
            priority: TaskPriority::High,
            status: TaskStatus::Completed,
            due_date: due,
            is_completed: true,
            completed_at: Some(Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()),
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            recurrence: Some(RecurrenceRule {
                id: 5,
                task_id: 1,
                pattern,
                interval,
                start_date: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
                end_date: end,
            }),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_daily_advances_by_interval_days() {
        let due = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let task = recurring_task(RecurrencePattern::Daily, 3, Some(due), None);

        let next = next_occurrence(&task, now()).unwrap();
        assert_eq!(
            next.due_date.unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 4, 9, 0, 0).unwrap()
        );
        assert_eq!(next.user_id, task.user_id);
        assert_eq!(next.title, task.title);
        assert_eq!(next.priority, task.priority);
        assert_eq!(next.status, TaskStatus::Todo);
    }

    #[test]
    fn test_weekly_advances_by_seven_day_multiples() {
        let due = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let task = recurring_task(RecurrencePattern::Weekly, 2, Some(due), None);

        let next = next_occurrence(&task, now()).unwrap();
        assert_eq!(
            next.due_date.unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 15, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_monthly_clamps_to_month_end() {
        let due = Utc.with_ymd_and_hms(2025, 1, 31, 9, 0, 0).unwrap();
        let task = recurring_task(RecurrencePattern::Monthly, 1, Some(due), None);

        let next = next_occurrence(&task, Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap())
            .unwrap();
        assert_eq!(
            next.due_date.unwrap(),
            Utc.with_ymd_and_hms(2025, 2, 28, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_yearly_clamps_leap_day() {
        let due = Utc.with_ymd_and_hms(2024, 2, 29, 9, 0, 0).unwrap();
        let task = recurring_task(RecurrencePattern::Yearly, 1, Some(due), None);

        let next = next_occurrence(&task, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
            .unwrap();
        assert_eq!(
            next.due_date.unwrap(),
            Utc.with_ymd_and_hms(2025, 2, 28, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_rule_is_copied_not_shared() {
        let due = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let task = recurring_task(RecurrencePattern::Daily, 3, Some(due), None);

        let next = next_occurrence(&task, now()).unwrap();
        let copy = next.recurrence.unwrap();
        let original = task.recurrence.as_ref().unwrap();
        assert_eq!(copy.pattern, original.pattern);
        assert_eq!(copy.interval, original.interval);
        assert_eq!(copy.start_date, original.start_date);
        assert_eq!(copy.end_date, original.end_date);
    }

    #[test]
    fn test_non_recurring_task_fails() {
        let mut task = recurring_task(RecurrencePattern::Daily, 1, None, None);
        task.recurrence = None;
        assert!(matches!(
            next_occurrence(&task, now()),
            Err(KansoError::NotRecurring)
        ));
    }

    #[test]
    fn test_expired_rule_fails() {
        let end = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        let task = recurring_task(RecurrencePattern::Daily, 1, None, Some(end));
        assert!(matches!(
            next_occurrence(&task, now()),
            Err(KansoError::RecurrenceExpired)
        ));
    }

    #[test]
    fn test_end_date_equal_to_now_is_not_expired() {
        let task = recurring_task(RecurrencePattern::Daily, 1, None, Some(now()));
        assert!(next_occurrence(&task, now()).is_ok());
    }

    #[test]
    fn test_no_due_date_yields_no_due_date() {
        let task = recurring_task(RecurrencePattern::Weekly, 1, None, None);
        let next = next_occurrence(&task, now()).unwrap();
        assert!(next.due_date.is_none());
    }

    #[test]
    fn test_zero_interval_fails() {
        let due = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let task = recurring_task(RecurrencePattern::Daily, 0, Some(due), None);
        assert!(matches!(
            next_occurrence(&task, now()),
            Err(KansoError::InvalidRange(_))
        ));
    }
}
