use thiserror::Error;

/// Top-level error type for Kanso.
#[derive(Debug, Error)]
pub enum KansoError {
    /// Referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Caller is not the entity's owner or counterparty.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// State-machine precondition violated (duplicate or invalid transition).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Interval end is not after its start, or a date computation overflowed.
    #[error("invalid range: {0}")]
    InvalidRange(String),

    /// Task carries no recurrence rule.
    #[error("task is not recurring")]
    NotRecurring,

    /// Recurrence rule's end date is in the past.
    #[error("recurrence end date has passed")]
    RecurrenceExpired,

    /// Nothing to serialize into a calendar file.
    #[error("no events to export")]
    NoEvents,

    /// External text did not match any closed enum variant.
    #[error("unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Transport error.
    #[error("transport error: {0}")]
    Transport(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
