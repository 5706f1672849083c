//! Wire types of the Cloudron REST API.

use serde::{Deserialize, Serialize};

/// Installation state reported once an app is fully installed.
pub const STATE_INSTALLED: &str = "installed";

/// Installation state reported when installation failed.
pub const STATE_ERROR: &str = "error";

/// Health value of an app that passed its health check.
pub const HEALTH_HEALTHY: &str = "healthy";

/// An installed (or installing) app.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct App {
    /// App id.
    pub id: String,
    /// Subdomain the app is reachable at.
    #[serde(default)]
    pub location: String,
    /// Fully qualified domain name, when the server reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
    /// Manifest summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<ManifestSummary>,
    /// `installed`, `error`, or a transient in-progress state.
    #[serde(default)]
    pub installation_state: String,
    /// Progress text, optionally `phase,detail`.
    #[serde(default)]
    pub installation_progress: Option<String>,
    /// `running` or `stopped`.
    #[serde(default)]
    pub run_state: Option<String>,
    /// Health check result.
    #[serde(default)]
    pub health: Option<String>,
}

/// The part of an app manifest the CLI displays.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestSummary {
    /// Manifest id, e.g. `io.example.app`.
    #[serde(default)]
    pub id: String,
    /// Package version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Human readable title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl App {
    /// Whether installation completed.
    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.installation_state == STATE_INSTALLED
    }

    /// Whether installation failed.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.installation_state == STATE_ERROR
    }

    /// Whether the health check passed.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.health.as_deref() == Some(HEALTH_HEALTHY)
    }

    /// Manifest id, empty when unknown.
    #[must_use]
    pub fn manifest_id(&self) -> &str {
        self.manifest.as_ref().map_or("", |m| m.id.as_str())
    }

    /// Progress label to display: the detail of `phase,detail`, trimmed.
    #[must_use]
    pub fn progress_label(&self) -> Option<&str> {
        let progress = self.installation_progress.as_deref()?;
        let label = match progress.split_once(',') {
            Some((_, detail)) => detail,
            None => progress,
        }
        .trim();
        (!label.is_empty()).then_some(label)
    }
}

/// Response of `GET /api/v1/apps`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppList {
    /// All apps.
    #[serde(default)]
    pub apps: Vec<App>,
}

/// Response of `POST /api/v1/developer/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    /// Fresh developer token.
    pub token: String,
}

/// Response of calls that create a resource.
#[derive(Debug, Clone, Deserialize)]
pub struct IdResponse {
    /// Id of the created resource.
    pub id: String,
}

/// Error body returned by the server.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    /// Human readable message.
    pub message: String,
}

/// Status of a submitted build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildStatus {
    /// Build id.
    pub id: String,
    /// `pending`, `building`, `success` or `failed`.
    pub status: String,
    /// Image produced on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker_image: Option<String>,
    /// Failure reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl BuildStatus {
    /// Whether the build finished successfully.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }

    /// Whether the build finished unsuccessfully.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self.status.as_str(), "failed" | "error")
    }
}
