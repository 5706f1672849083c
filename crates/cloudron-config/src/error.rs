//! Error types for configuration storage.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur while loading or saving the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The home directory could not be determined.
    #[error("cannot determine home directory")]
    NoHomeDir,

    /// The configuration file exists but is not valid JSON.
    #[error("malformed config file {path}: {message}")]
    Malformed {
        /// Path of the offending file.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// A build id was not found in the history of an app.
    #[error("build '{build_id}' not found for app '{app_id}'")]
    BuildNotFound {
        /// App the build was looked up for.
        app_id: String,
        /// The missing build id.
        build_id: String,
    },

    /// Serialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error while reading or writing the file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
