//! JSON file-backed configuration store.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ConfigError, Result};
use crate::session::Session;

/// File name of the default configuration, relative to the home directory.
pub const DEFAULT_FILE_NAME: &str = ".cloudron.json";

/// One submitted build of an app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildRecord {
    /// Build id assigned by the build service.
    pub id: String,
    /// Submission time.
    pub timestamp: DateTime<Utc>,
    /// Image produced by the build, once it succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker_image: Option<String>,
}

impl BuildRecord {
    /// Creates a record for a build submitted now.
    #[must_use]
    pub fn submitted(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            timestamp: Utc::now(),
            docker_image: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    /// Working directory -> app id.
    #[serde(default)]
    apps: BTreeMap<String, String>,
    /// App id -> builds in submission order.
    #[serde(default)]
    builds: BTreeMap<String, Vec<BuildRecord>>,
}

/// Configuration loaded from, and written back to, a JSON file.
#[derive(Debug)]
pub struct Config {
    path: PathBuf,
    doc: Document,
}

impl Config {
    /// Default location of the configuration file.
    pub fn default_path() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|home| home.join(DEFAULT_FILE_NAME))
            .ok_or(ConfigError::NoHomeDir)
    }

    /// Loads the configuration at `path`. A missing file yields an empty configuration.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let doc = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => Document::default(),
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| ConfigError::Malformed {
                path: path.clone(),
                message: e.to_string(),
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file yet");
                Document::default()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, doc })
    }

    /// Path this configuration is persisted to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the configuration to disk.
    ///
    /// The document is written to a sibling temp file first and renamed over the
    /// target so a crash never leaves a truncated file behind.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&self.doc)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            warn!(error = %e, "failed to move config into place");
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        debug!(path = %self.path.display(), "saved config");
        Ok(())
    }

    /// Snapshot of the current session.
    #[must_use]
    pub fn session(&self) -> Session {
        Session {
            host: self.doc.host.clone(),
            token: self.doc.token.clone(),
        }
    }

    /// Sets the Cloudron host and persists it.
    pub fn set_host(&mut self, host: impl Into<String>) -> Result<()> {
        self.doc.host = Some(host.into());
        self.save()
    }

    /// Replaces the token and persists it.
    pub fn set_token(&mut self, token: impl Into<String>) -> Result<()> {
        self.doc.token = Some(token.into());
        self.save()
    }

    /// Forgets the token, keeping the host and history.
    pub fn clear_token(&mut self) -> Result<()> {
        self.doc.token = None;
        self.save()
    }

    /// App id remembered for a working directory.
    #[must_use]
    pub fn app_for_dir(&self, dir: &Path) -> Option<&str> {
        self.doc.apps.get(&dir_key(dir)).map(String::as_str)
    }

    /// Remembers `app_id` for a working directory.
    pub fn set_app_for_dir(&mut self, dir: &Path, app_id: impl Into<String>) -> Result<()> {
        self.doc.apps.insert(dir_key(dir), app_id.into());
        self.save()
    }

    /// Forgets every directory bound to `app_id`, e.g. after uninstalling it.
    pub fn forget_app(&mut self, app_id: &str) -> Result<()> {
        self.doc.apps.retain(|_, id| id != app_id);
        self.save()
    }

    /// Builds of an app in submission order.
    #[must_use]
    pub fn builds(&self, app_id: &str) -> &[BuildRecord] {
        self.doc.builds.get(app_id).map_or(&[], Vec::as_slice)
    }

    /// Most recently submitted build of an app.
    #[must_use]
    pub fn latest_build(&self, app_id: &str) -> Option<&BuildRecord> {
        self.builds(app_id).last()
    }

    /// Appends a build to the history of an app.
    pub fn add_build(&mut self, app_id: &str, record: BuildRecord) -> Result<()> {
        self.doc
            .builds
            .entry(app_id.to_string())
            .or_default()
            .push(record);
        self.save()
    }

    /// Records the image produced by a build, keeping its position in the history.
    pub fn complete_build(
        &mut self,
        app_id: &str,
        build_id: &str,
        docker_image: impl Into<String>,
    ) -> Result<()> {
        let record = self
            .doc
            .builds
            .get_mut(app_id)
            .and_then(|builds| builds.iter_mut().find(|b| b.id == build_id))
            .ok_or_else(|| ConfigError::BuildNotFound {
                app_id: app_id.to_string(),
                build_id: build_id.to_string(),
            })?;
        record.docker_image = Some(docker_image.into());
        self.save()
    }
}

fn dir_key(dir: &Path) -> String {
    dir.to_string_lossy().into_owned()
}
