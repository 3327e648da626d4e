//! Error types for vidnotify
//!
//! Collaborator failures are converted into `VisibilityStatus` values or
//! send failures at the engine boundary; only configuration and local state
//! I/O errors ever abort a run.

use thiserror::Error;

/// Result type alias for vidnotify operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for vidnotify
#[derive(Error, Debug)]
pub enum Error {
    /// Feed fetch or parse errors
    #[error("Feed error: {0}")]
    Feed(String),

    /// Notification delivery errors
    #[error("Notifier error: {0}")]
    Notifier(String),

    /// State store-related errors
    #[error("State store error: {0}")]
    StateStore(String),

    /// Remote mirror errors (never fatal)
    #[error("Mirror error: {0}")]
    Mirror(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// State serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// A collaborator call exceeded its time budget
    #[error("Timed out: {0}")]
    Timeout(String),
}

impl Error {
    /// Create a feed error
    pub fn feed(msg: impl Into<String>) -> Self {
        Self::Feed(msg.into())
    }

    /// Create a notifier error
    pub fn notifier(msg: impl Into<String>) -> Self {
        Self::Notifier(msg.into())
    }

    /// Create a state store error
    pub fn state_store(msg: impl Into<String>) -> Self {
        Self::StateStore(msg.into())
    }

    /// Create a mirror error
    pub fn mirror(msg: impl Into<String>) -> Self {
        Self::Mirror(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }
}
