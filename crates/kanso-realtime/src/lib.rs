//! # kanso-realtime
//!
//! Connection registry and push transports for Kanso.

pub mod events;
pub mod local;
pub mod registry;

pub use local::LocalTransport;
pub use registry::ConnectionRegistry;
