use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::KansoError;
use crate::export::ExportableEvent;

/// MIME type for generated calendar files.
pub const MIME_TYPE: &str = "text/calendar";

const PROD_ID: &str = "-//Kanso//EN";

/// File name for a calendar generated at `now`.
pub fn file_name(now: DateTime<Utc>) -> String {
    format!("productivity-calendar-{}.ics", now.format("%Y%m%d"))
}

/// Serialize events into an iCalendar document.
pub fn serialize(events: &[ExportableEvent]) -> Result<Vec<u8>, KansoError> {
    serialize_at(events, Utc::now())
}

/// Serialize events, stamping generated fields with `now`.
///
/// Output is byte-stable for identical inputs apart from the UID lines,
/// which are freshly generated per event.
pub fn serialize_at(events: &[ExportableEvent], now: DateTime<Utc>) -> Result<Vec<u8>, KansoError> {
    if events.is_empty() {
        return Err(KansoError::NoEvents);
    }

    let stamp = format_utc(now);
    let mut out = String::new();
    push_line(&mut out, "BEGIN:VCALENDAR");
    push_line(&mut out, "VERSION:2.0");
    push_line(&mut out, &format!("PRODID:{PROD_ID}"));
    push_line(&mut out, "CALSCALE:GREGORIAN");
    push_line(&mut out, "METHOD:PUBLISH");

    for event in events {
        push_line(&mut out, "BEGIN:VEVENT");
        push_line(&mut out, &format!("UID:{}", Uuid::new_v4()));
        push_line(&mut out, &format!("SUMMARY:{}", event.title));
        push_line(&mut out, &format!("DTSTART:{}", format_utc(event.start)));
        push_line(&mut out, &format!("DTEND:{}", format_utc(event.end)));
        push_line(&mut out, &format!("DTSTAMP:{stamp}"));
        push_line(&mut out, &format!("CREATED:{stamp}"));
        push_line(&mut out, &format!("CATEGORIES:{}", event.source.category()));
        push_line(&mut out, "END:VEVENT");
    }

    push_line(&mut out, "END:VCALENDAR");
    Ok(out.into_bytes())
}

// RFC 5545 line ending.
fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push_str("\r\n");
}

/// `yyyyMMddTHHmmssZ` in UTC.
fn format_utc(t: DateTime<Utc>) -> String {
    t.format("%Y%m%dT%H%M%SZ").to_string()
}
