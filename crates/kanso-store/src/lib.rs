//! # kanso-store
//!
//! SQLite-backed persistence for the Kanso productivity backend.

pub mod store;

pub use store::{Store, StoreCounts};
