//! Merge a user's schedule into exportable events and render them as an
//! iCalendar file.

use chrono::{DateTime, Duration, Utc};
use kanso_core::error::KansoError;
use kanso_core::export::{EventSource, ExportableEvent};
use kanso_core::ical;
use kanso_store::Store;
use tracing::info;

/// A rendered calendar ready to be written to disk or sent as a download.
pub struct CalendarFile {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct ExportService {
    store: Store,
}

impl ExportService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Everything schedulable in `[start, end]`: time blocks as-is, due
    /// tasks as one-hour events, ended focus sessions as their real span.
    pub async fn exportable_events(
        &self,
        user_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ExportableEvent>, KansoError> {
        let mut events = Vec::new();

        for block in self.store.time_blocks_for_user(user_id, start, end).await? {
            events.push(ExportableEvent {
                title: block.title,
                start: block.start_time,
                end: block.end_time,
                source: EventSource::TimeBlock,
                source_id: block.id,
            });
        }

        for task in self.store.due_tasks_for_user(user_id, start, end).await? {
            let Some(due) = task.due_date else { continue };
            events.push(ExportableEvent {
                title: format!("Due: {}", task.title),
                start: due,
                end: due + Duration::hours(1),
                source: EventSource::Task,
                source_id: task.id,
            });
        }

        for session in self.store.sessions_for_user(user_id, start, end).await? {
            let Some(session_end) = session.end_time else {
                continue;
            };
            events.push(ExportableEvent {
                title: format!("Focus: {}", session.mode.as_str()),
                start: session.start_time,
                end: session_end,
                source: EventSource::FocusSession,
                source_id: session.id,
            });
        }

        Ok(events)
    }

    /// Render the window as an `.ics` download. Fails with `NoEvents` when
    /// there is nothing to export.
    pub async fn calendar_file(
        &self,
        user_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<CalendarFile, KansoError> {
        let events = self.exportable_events(user_id, start, end).await?;
        let now = Utc::now();
        let bytes = ical::serialize_at(&events, now)?;
        info!("exported {} events for user {user_id}", events.len());
        Ok(CalendarFile {
            file_name: ical::file_name(now),
            content_type: ical::MIME_TYPE,
            bytes,
        })
    }
}
