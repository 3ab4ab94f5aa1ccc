//! # kanso
//!
//! Personal productivity backend: tasks with recurrence, calendar time
//! blocks, focus sessions, a friend graph, notifications with real-time
//! push, and iCalendar export.

pub mod app;
pub mod services;
