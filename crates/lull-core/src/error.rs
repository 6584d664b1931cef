use thiserror::Error;

/// Top-level error type for lull.
#[derive(Debug, Error)]
pub enum LullError {
    /// Storage error.
    #[error("store error: {0}")]
    Store(String),

    /// Notification delivery error.
    #[error("delivery error: {0}")]
    Delivery(String),

    /// Schedule definition or registration error.
    #[error("schedule error: {0}")]
    Schedule(String),

    /// Insight generation error.
    #[error("insight error: {0}")]
    Insight(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
