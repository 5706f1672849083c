//! CLI error types.

use std::fmt;

use cloudron_api::ApiError;
use cloudron_config::ConfigError;

/// CLI-specific errors.
#[derive(Debug)]
pub enum CliError {
    /// Request or protocol failure.
    Api(ApiError),
    /// Configuration could not be read or written.
    Config(ConfigError),
    /// No app is selected and none could be chosen.
    NoApp(String),
    /// The working directory has no usable app manifest.
    Manifest(String),
    /// Invalid argument.
    InvalidArgument(String),
    /// Output formatting error.
    Format(String),
    /// IO error.
    Io(std::io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Api(e) => write!(f, "{e}"),
            Self::Config(e) => write!(f, "{e}"),
            Self::NoApp(msg) => write!(f, "no app: {msg}"),
            Self::Manifest(msg) => write!(f, "manifest error: {msg}"),
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Self::Format(msg) => write!(f, "format error: {msg}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Api(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ApiError> for CliError {
    fn from(err: ApiError) -> Self {
        Self::Api(err)
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}
