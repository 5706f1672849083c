//! The authenticated session of one CLI invocation.

use serde::{Deserialize, Serialize};

/// Host and token used to talk to a Cloudron.
///
/// A session is created by `login`, its token is replaced by re-authentication
/// and it is cleared by `logout`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Cloudron host, with or without scheme.
    pub host: Option<String>,
    /// Developer access token.
    pub token: Option<String>,
}

impl Session {
    /// Creates a session for `host` without a token.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
            token: None,
        }
    }

    /// Returns the session with `token` set.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Base URL of the REST API, `None` when no host is configured.
    ///
    /// Bare hosts are reached over https. A host that already carries a scheme
    /// is used as is, minus any trailing slash.
    #[must_use]
    pub fn api_endpoint(&self) -> Option<String> {
        let host = self.host.as_deref()?.trim();
        if host.is_empty() {
            return None;
        }
        if host.starts_with("http://") || host.starts_with("https://") {
            Some(host.trim_end_matches('/').to_string())
        } else {
            Some(format!("https://{}", host.trim_end_matches('/')))
        }
    }

    /// Whether a token is present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }
}
