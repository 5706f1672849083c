//! Per-invocation state shared by all commands.

use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cloudron_api::{ApiClient, App, HttpTransport, TerminalPrompt};
use cloudron_config::Config;
use parking_lot::{Mutex, MutexGuard};
use serde::Deserialize;
use tracing::debug;

use crate::cli::Cli;
use crate::error::CliError;
use crate::output::OutputFormat;

/// Manifest file describing the app in a source directory.
pub const MANIFEST_FILE: &str = "CloudronManifest.json";

/// Loaded configuration, API client and app selection for one command.
pub struct Context {
    client: ApiClient,
    config: Arc<Mutex<Config>>,
    cwd: PathBuf,
    app: Option<String>,
    format: OutputFormat,
}

impl Context {
    /// Load the configuration named by `cli` and build a client for it.
    ///
    /// A `--host` that differs from the stored host replaces it.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be read or written, or the
    /// HTTP client cannot be built.
    pub fn load(cli: &Cli) -> Result<Self, CliError> {
        let path = match &cli.config {
            Some(path) => path.clone(),
            None => Config::default_path()?,
        };
        let mut config = Config::load(&path)?;
        if let Some(host) = &cli.host {
            if config.session().host.as_deref() != Some(host.as_str()) {
                debug!(%host, "switching host");
                config.set_host(host.as_str())?;
                config.clear_token()?;
            }
        }

        let config = Arc::new(Mutex::new(config));
        let transport = HttpTransport::with_insecure(cli.allow_selfsigned)?;
        let client = ApiClient::new(
            transport,
            Arc::clone(&config),
            Box::new(TerminalPrompt::new()),
        );

        Ok(Self {
            client,
            config,
            cwd: std::env::current_dir()?,
            app: cli.app.clone(),
            format: OutputFormat::new(cli.format),
        })
    }

    /// The API client.
    #[must_use]
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Lock the configuration.
    pub fn config(&self) -> MutexGuard<'_, Config> {
        self.config.lock()
    }

    /// The working directory.
    #[must_use]
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Output formatter.
    #[must_use]
    pub fn format(&self) -> &OutputFormat {
        &self.format
    }

    /// The app to operate on.
    ///
    /// Uses `--app`, then the app remembered for the working directory, then
    /// the only installed app, and finally asks the user to pick one. A picked
    /// app is remembered for the working directory.
    ///
    /// # Errors
    ///
    /// Returns `NoApp` if no app is installed, or a request error.
    pub async fn select_app(&self) -> Result<String, CliError> {
        if let Some(app) = &self.app {
            return Ok(app.clone());
        }
        if let Some(app) = self.config().app_for_dir(&self.cwd) {
            return Ok(app.to_string());
        }

        let apps = self.client.list_apps().await?;
        let chosen = match apps.as_slice() {
            [] => return Err(CliError::NoApp("no apps installed".into())),
            [only] => only.id.clone(),
            _ => {
                let stdin = std::io::stdin();
                let index = choose_app(&apps, stdin.lock(), std::io::stderr())?;
                apps[index].id.clone()
            }
        };
        self.config().set_app_for_dir(&self.cwd, chosen.as_str())?;
        Ok(chosen)
    }

    /// Key under which builds of the working directory are recorded.
    ///
    /// # Errors
    ///
    /// Returns `Manifest` if the directory has no readable manifest.
    pub fn project_id(&self) -> Result<String, CliError> {
        project_id(&self.cwd)
    }
}

/// Show a numbered menu of `apps` on `out` and read a choice from `input`.
///
/// Invalid input is reported and the question repeated.
///
/// # Errors
///
/// Returns `NoApp` if `input` ends before a valid choice was made.
pub fn choose_app<R: BufRead, W: Write>(
    apps: &[App],
    mut input: R,
    mut out: W,
) -> Result<usize, CliError> {
    for (i, app) in apps.iter().enumerate() {
        writeln!(out, "[{}] {} ({})", i + 1, app.location, app.manifest_id())?;
    }
    loop {
        write!(out, "Choose app [1-{}]: ", apps.len())?;
        out.flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(CliError::NoApp("no app chosen".into()));
        }
        match line.trim().parse::<usize>() {
            Ok(n) if (1..=apps.len()).contains(&n) => return Ok(n - 1),
            _ => writeln!(out, "Invalid choice: {}", line.trim())?,
        }
    }
}

#[derive(Deserialize)]
struct ManifestId {
    id: String,
}

/// Manifest id of the app whose sources live in `dir`.
///
/// # Errors
///
/// Returns `Manifest` if the manifest is missing, malformed or has no id.
pub fn project_id(dir: &Path) -> Result<String, CliError> {
    let path = dir.join(MANIFEST_FILE);
    let raw = fs::read_to_string(&path)
        .map_err(|e| CliError::Manifest(format!("{}: {e}", path.display())))?;
    let manifest: ManifestId = serde_json::from_str(&raw)
        .map_err(|e| CliError::Manifest(format!("{}: {e}", path.display())))?;
    if manifest.id.trim().is_empty() {
        return Err(CliError::Manifest(format!("{}: empty id", path.display())));
    }
    Ok(manifest.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn apps() -> Vec<App> {
        ["blog", "wiki", "chat"]
            .iter()
            .enumerate()
            .map(|(i, location)| App {
                id: format!("app-{i}"),
                location: (*location).to_string(),
                ..App::default()
            })
            .collect()
    }

    #[test]
    fn choose_app_valid_choice() {
        let mut out = Vec::new();
        let index = choose_app(&apps(), Cursor::new("2\n"), &mut out).expect("choice");
        assert_eq!(index, 1);
        let shown = String::from_utf8(out).expect("utf8");
        assert!(shown.contains("[1] blog"));
        assert!(shown.contains("[3] chat"));
    }

    #[test]
    fn choose_app_retries_on_invalid_input() {
        let mut out = Vec::new();
        let index =
            choose_app(&apps(), Cursor::new("0\nfoo\n\n4\n3\n"), &mut out).expect("choice");
        assert_eq!(index, 2);
        let shown = String::from_utf8(out).expect("utf8");
        assert_eq!(shown.matches("Invalid choice").count(), 4);
        assert_eq!(shown.matches("Choose app [1-3]: ").count(), 5);
    }

    #[test]
    fn choose_app_eof_is_no_app() {
        let err = choose_app(&apps(), Cursor::new("x\n"), Vec::new()).expect_err("eof");
        assert!(matches!(err, CliError::NoApp(_)));
    }

    #[test]
    fn project_id_reads_manifest() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join(MANIFEST_FILE),
            r#"{"id":"io.example.blog","version":"1.0.0"}"#,
        )
        .expect("write");
        assert_eq!(project_id(dir.path()).expect("id"), "io.example.blog");
    }

    #[test]
    fn project_id_missing_manifest() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = project_id(dir.path()).expect_err("missing");
        assert!(matches!(err, CliError::Manifest(_)));
    }

    #[test]
    fn project_id_empty_id() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join(MANIFEST_FILE), r#"{"id":" "}"#).expect("write");
        assert!(matches!(project_id(dir.path()), Err(CliError::Manifest(_))));
    }
}
