//! Installation progress tracking.
//!
//! [`ProgressPoller`] polls the app status on a fixed interval and renders the
//! progress as it changes:
//!
//! ```text
//! Waiting for installation to start
//!  => Downloading image ....
//!  => Creating container ..
//!
//! Waiting for app to become healthy...
//! ```
//!
//! Polls never overlap: the next one is scheduled after the previous response
//! was rendered. Waiting uses tokio's clock, so tests can run with a paused clock.

use std::future::Future;
use std::io::Write;
use std::pin::Pin;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, trace};

use crate::client::ApiClient;
use crate::error::{ApiError, Result};
use crate::transport::Transport;
use crate::types::App;

/// Default interval between two polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Labels containing this text do not get progress dots.
///
/// Image builds report one label for minutes; a growing row of dots suggests
/// progress that the server does not actually report.
pub const DEFAULT_QUIET_MARKER: &str = "Building image";

/// Source of app status snapshots.
pub trait AppStatusSource: Send + Sync {
    /// Fetch the current state of an app.
    ///
    /// # Errors
    ///
    /// Returns an error if the status cannot be fetched.
    fn app_status<'a>(
        &'a self,
        app_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<App>> + Send + 'a>>;
}

impl<S: AppStatusSource + ?Sized> AppStatusSource for &S {
    fn app_status<'a>(
        &'a self,
        app_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<App>> + Send + 'a>> {
        (**self).app_status(app_id)
    }
}

impl<T: Transport> AppStatusSource for ApiClient<T> {
    fn app_status<'a>(
        &'a self,
        app_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<App>> + Send + 'a>> {
        Box::pin(self.app(app_id))
    }
}

/// Progress of one polling loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressState {
    /// Label rendered last.
    pub current_label: Option<String>,
    /// Whether the "waiting to start" header was printed.
    pub announced_start: bool,
    /// Whether installation finished and the health check is awaited.
    pub waiting_for_health: bool,
    /// Whether a terminal state was reached.
    pub terminal: bool,
}

/// Polls an app until installation succeeded or failed.
#[derive(Debug, Clone)]
pub struct ProgressPoller<S> {
    source: S,
    interval: Duration,
    quiet_marker: Option<String>,
}

impl<S: AppStatusSource> ProgressPoller<S> {
    /// Create a poller with the default interval and quiet marker.
    pub fn new(source: S) -> Self {
        Self {
            source,
            interval: DEFAULT_POLL_INTERVAL,
            quiet_marker: Some(DEFAULT_QUIET_MARKER.to_string()),
        }
    }

    /// Set the polling interval.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set or disable the quiet marker.
    #[must_use]
    pub fn with_quiet_marker(mut self, marker: Option<String>) -> Self {
        self.quiet_marker = marker;
        self
    }

    /// Poll until the app is installed (and healthy, if `wait_for_health`).
    ///
    /// # Errors
    ///
    /// Returns `InstallFailed` with the server's progress text if the app
    /// enters the error state, or the first transport error.
    pub async fn wait_for_installation<W: Write>(
        &self,
        app_id: &str,
        wait_for_health: bool,
        out: &mut W,
    ) -> Result<()> {
        let mut state = ProgressState::default();
        let mut polls = 0_u32;
        loop {
            let app = self.source.app_status(app_id).await?;
            polls += 1;
            trace!(app_id, polls, state = %app.installation_state, "polled");

            self.advance(&mut state, &app, wait_for_health, out)?;
            if state.terminal {
                writeln!(out)?;
                out.flush()?;
                debug!(app_id, polls, "installation finished");
                return Ok(());
            }
            sleep(self.interval).await;
        }
    }

    /// Apply one status snapshot to `state`, rendering what changed.
    ///
    /// # Errors
    ///
    /// Returns `InstallFailed` for the error state, or an IO error.
    pub fn advance<W: Write>(
        &self,
        state: &mut ProgressState,
        app: &App,
        wait_for_health: bool,
        out: &mut W,
    ) -> Result<()> {
        if app.is_error() {
            state.terminal = true;
            writeln!(out)?;
            return Err(ApiError::InstallFailed(
                app.installation_progress.clone().unwrap_or_default(),
            ));
        }

        if app.is_installed() {
            if !wait_for_health || app.is_healthy() {
                state.terminal = true;
                return Ok(());
            }
            if !state.waiting_for_health {
                state.waiting_for_health = true;
                write!(out, "\n\nWaiting for app to become healthy")?;
            }
            write!(out, ".")?;
            out.flush()?;
            return Ok(());
        }

        match app.progress_label() {
            None => match state.current_label.as_deref() {
                None if !state.announced_start => {
                    state.announced_start = true;
                    write!(out, "Waiting for installation to start")?;
                }
                None => {}
                Some(label) => {
                    if !self.is_quiet(label) {
                        write!(out, ".")?;
                    }
                }
            },
            Some(label) if state.current_label.as_deref() == Some(label) => {
                if !self.is_quiet(label) {
                    write!(out, ".")?;
                }
            }
            Some(label) => {
                write!(out, "\n => {label} ")?;
                state.current_label = Some(label.to_string());
            }
        }
        out.flush()?;
        Ok(())
    }

    /// Poll until the app no longer exists.
    ///
    /// # Errors
    ///
    /// Returns `InstallFailed` if uninstalling fails, or a transport error.
    pub async fn wait_for_removal<W: Write>(&self, app_id: &str, out: &mut W) -> Result<()> {
        write!(out, "Uninstalling")?;
        loop {
            match self.source.app_status(app_id).await {
                Ok(app) if app.is_error() => {
                    writeln!(out)?;
                    return Err(ApiError::InstallFailed(
                        app.installation_progress.unwrap_or_default(),
                    ));
                }
                Ok(_) => {
                    write!(out, ".")?;
                    out.flush()?;
                }
                Err(ApiError::Status { code: 404, .. }) => {
                    writeln!(out)?;
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
            sleep(self.interval).await;
        }
    }

    fn is_quiet(&self, label: &str) -> bool {
        self.quiet_marker
            .as_deref()
            .is_some_and(|marker| label.contains(marker))
    }
}
