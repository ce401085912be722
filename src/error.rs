//! Error types for bidwatch

use thiserror::Error;

/// Result type for bidwatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for bidwatch
#[derive(Debug, Error)]
pub enum Error {
    /// Required configuration is missing at startup
    #[error("Missing configuration: {0}")]
    Config(String),

    /// Navigation error (including failed arrival verification)
    #[error("Navigation error: {0}")]
    Navigation(String),

    /// Element not found in any searched frame
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Element exists but cannot be interacted with
    #[error("Element not interactive: '{label}' is {reason}")]
    ElementNotInteractive { label: String, reason: String },

    /// Frame/iframe not found
    #[error("Frame not found: {0}")]
    FrameNotFound(String),

    /// Timeout
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Driver error (the browser control surface failed)
    #[error("Driver error in {operation}: {message}")]
    Driver { operation: String, message: String },

    /// Persistent store error
    #[error("Store error: {0}")]
    Store(String),

    /// Notification sink error
    #[error("Notify error: {0}")]
    Notify(String),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a driver error with operation context
    pub fn driver(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Driver {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create an element not interactive error
    pub fn not_interactive(label: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ElementNotInteractive {
            label: label.into(),
            reason: reason.into(),
        }
    }

    /// Check whether this error should abort a run (vs. degrade a step)
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Navigation(_) | Error::Config(_))
    }
}
