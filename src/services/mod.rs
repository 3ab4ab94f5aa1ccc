//! Service layer over the store, registry, and transport.
//!
//! Services are plain structs; ownership checks happen here, with the
//! authenticated user id always passed in by the caller. Identity itself
//! (sessions, tokens) is out of scope.

mod export;
mod focus;
mod friendships;
mod notifications;
mod tasks;
mod time_blocks;

#[cfg(test)]
mod tests;

pub use export::{CalendarFile, ExportService};
pub use focus::FocusSessionService;
pub use friendships::FriendshipService;
pub use notifications::NotificationService;
pub use tasks::TaskService;
pub use time_blocks::{SavedBlock, TimeBlockService};
