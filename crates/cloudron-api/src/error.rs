//! Error types for Cloudron API operations.
//!
//! Transport failures, unexpected HTTP statuses and asynchronous domain failures
//! (installation, build) are distinct variants so callers can react to each.

use thiserror::Error;

/// Result type alias for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors that can occur while talking to a Cloudron.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No Cloudron host is configured.
    #[error("not logged in: run 'cloudron login <host>' first")]
    NotConfigured,

    /// The request could not be sent or the connection broke.
    #[error("transport error: {message}")]
    Transport {
        /// Description of the failure.
        message: String,
    },

    /// The server answered with an unexpected status.
    #[error("request failed with status {code}: {message}")]
    Status {
        /// HTTP status code.
        code: u16,
        /// Server-provided message, or the raw body.
        message: String,
    },

    /// Credentials were rejected again after re-authenticating.
    #[error("authentication failed: {reason}")]
    Unauthorized {
        /// Reason for the failure.
        reason: String,
    },

    /// The app reported an installation error.
    #[error("installation failed: {0}")]
    InstallFailed(String),

    /// A build failed or its log stream broke.
    #[error("build failed: {0}")]
    BuildFailed(String),

    /// The full build log is not available yet.
    #[error("build log is not ready yet")]
    LogNotReady,

    /// Remote exec requires an interactive terminal.
    #[error("stdin is not a terminal: exec needs an interactive tty")]
    NotATerminal,

    /// A release selector did not match any known release.
    #[error("unknown version: {0}")]
    UnknownVersion(String),

    /// Reading credentials from the terminal failed.
    #[error("prompt failed: {0}")]
    Prompt(String),

    /// Response body could not be decoded.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Persisting the session failed.
    #[error("config error: {0}")]
    Config(#[from] cloudron_config::ConfigError),

    /// Local IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Creates a `Transport` error with a message.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a `Status` error.
    #[must_use]
    pub fn status(code: u16, message: impl Into<String>) -> Self {
        Self::Status {
            code,
            message: message.into(),
        }
    }

    /// Status code carried by a `Status` error.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::transport(err.to_string())
    }
}
