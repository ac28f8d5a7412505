use thiserror::Error;

/// Top-level error type for InTouch.
#[derive(Debug, Error)]
pub enum IntouchError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// A reminder interval that cannot be used (zero or negative length).
    #[error("invalid interval: {0}")]
    InvalidInterval(String),

    /// Error reading the address book or message history.
    #[error("source error: {0}")]
    Source(String),

    /// Notification dispatch failed.
    #[error("notify error: {0}")]
    Notify(String),

    /// Persistence error.
    #[error("storage error: {0}")]
    Storage(String),

    /// The preference store is held by another cycle.
    #[error("lock error: {0}")]
    Lock(String),

    /// No contact with the given name in the roster.
    #[error("contact not found: {0}")]
    ContactNotFound(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
