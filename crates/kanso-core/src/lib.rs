//! # kanso-core
//!
//! Core types, domain rules, configuration, and error handling for the
//! Kanso productivity backend.

pub mod config;
pub mod error;
pub mod export;
pub mod focus;
pub mod friendship;
pub mod ical;
pub mod notification;
pub mod recurrence;
pub mod task;
pub mod timeblock;
pub mod traits;
pub mod user;
