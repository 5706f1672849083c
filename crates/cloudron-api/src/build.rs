//! Source builds on the Cloudron build service.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use flate2::Compression;
use flate2::write::GzEncoder;
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use tokio::time::sleep;
use tracing::{debug, info};

use crate::client::{ApiClient, expect_status, status_error};
use crate::error::{ApiError, Result};
use crate::poller::DEFAULT_POLL_INTERVAL;
use crate::stream::{EventStream, render_build_events};
use crate::transport::Transport;
use crate::types::{BuildStatus, IdResponse};

/// Status returned by the log stream of a build that already finished.
pub const STATUS_ALREADY_FINISHED: u16 = 412;

/// Status returned by the full log endpoint while the log is being written.
pub const STATUS_LOG_NOT_READY: u16 = 420;

/// Directory names never included in source archives.
const IGNORED_DIRS: &[&str] = &[".git", "node_modules", "target"];

/// Gzip-compressed tarball of `dir`, paths relative to `dir`.
///
/// # Errors
///
/// Returns an error if `dir` cannot be read.
pub fn archive_dir(dir: &Path) -> Result<Vec<u8>> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut tar = tar::Builder::new(encoder);
    tar.follow_symlinks(false);
    append_tree(&mut tar, dir, Path::new(""))?;
    let encoder = tar.into_inner()?;
    Ok(encoder.finish()?)
}

fn append_tree<W: Write>(tar: &mut tar::Builder<W>, root: &Path, rel: &Path) -> Result<()> {
    let mut entries = fs::read_dir(root.join(rel))?.collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(fs::DirEntry::file_name);
    for entry in entries {
        let name = entry.file_name();
        let rel_path = rel.join(&name);
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            if IGNORED_DIRS.iter().any(|ignored| name == *ignored) {
                continue;
            }
            tar.append_dir(&rel_path, entry.path())?;
            append_tree(tar, root, &rel_path)?;
        } else {
            tar.append_path_with_name(entry.path(), &rel_path)?;
        }
    }
    Ok(())
}

/// Client for the build endpoints.
#[derive(Debug)]
pub struct BuildService<'a, T> {
    client: &'a ApiClient<T>,
    interval: Duration,
}

impl<'a, T: Transport> BuildService<'a, T> {
    /// Create a service using `client`.
    #[must_use]
    pub fn new(client: &'a ApiClient<T>) -> Self {
        Self {
            client,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set the interval used while waiting for a build.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Upload a source archive and return the new build id.
    ///
    /// # Errors
    ///
    /// Returns an error unless the server answers `201 Created`.
    pub async fn submit(&self, archive: Vec<u8>) -> Result<String> {
        debug!(bytes = archive.len(), "submitting build");
        let response = self
            .client
            .send(|ctx| {
                let part = Part::bytes(archive.clone()).file_name("source.tar.gz");
                ctx.post("/api/v1/developers/builds")
                    .multipart(Form::new().part("sourceArchive", part))
            })
            .await?;
        let response = expect_status(response, StatusCode::CREATED).await?;
        let id = response.json::<IdResponse>().await?.id;
        info!(build_id = %id, "build submitted");
        Ok(id)
    }

    /// Current status of a build.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn status(&self, build_id: &str) -> Result<BuildStatus> {
        self.client
            .get_json(&format!("/api/v1/developers/builds/{build_id}"))
            .await
    }

    /// Poll until the build finished and return its image.
    ///
    /// # Errors
    ///
    /// Returns `BuildFailed` if the build failed or produced no image.
    pub async fn wait(&self, build_id: &str) -> Result<String> {
        loop {
            let status = self.status(build_id).await?;
            if status.is_success() {
                return status.docker_image.ok_or_else(|| {
                    ApiError::BuildFailed(format!("build {build_id} reported no image"))
                });
            }
            if status.is_failed() {
                return Err(ApiError::BuildFailed(
                    status.message.unwrap_or_else(|| status.status.clone()),
                ));
            }
            sleep(self.interval).await;
        }
    }

    /// Stream the log of a build while it runs.
    ///
    /// A build that already finished is answered with the full log instead.
    ///
    /// # Errors
    ///
    /// Returns `BuildFailed` for build errors and broken streams.
    pub async fn follow_log<W: Write>(&self, build_id: &str, out: &mut W) -> Result<()> {
        let path = format!("/api/v1/developers/builds/{build_id}/logstream");
        let response = self
            .client
            .send(|ctx| ctx.get(&path).header(ACCEPT, "text/event-stream"))
            .await?;

        match response.status().as_u16() {
            200 => {}
            STATUS_ALREADY_FINISHED => {
                debug!(build_id, "build already finished, fetching full log");
                return self.print_log(build_id, out).await;
            }
            code => {
                let err = status_error(response).await;
                return Err(ApiError::BuildFailed(format!(
                    "log stream failed with status {code}: {err}"
                )));
            }
        }

        let mut events = EventStream::new(response.bytes_stream());
        render_build_events(&mut events, out).await
    }

    /// Print the complete log of a build in one go.
    ///
    /// # Errors
    ///
    /// Returns `LogNotReady` while the log is still being written.
    pub async fn print_log<W: Write>(&self, build_id: &str, out: &mut W) -> Result<()> {
        let path = format!("/api/v1/developers/builds/{build_id}/log");
        let response = self.client.send(|ctx| ctx.get(&path)).await?;
        if response.status().as_u16() == STATUS_LOG_NOT_READY {
            return Err(ApiError::LogNotReady);
        }
        let response = expect_status(response, StatusCode::OK).await?;
        let body = response.bytes().await?;
        out.write_all(&body)?;
        if !body.ends_with(b"\n") {
            writeln!(out)?;
        }
        out.flush()?;
        Ok(())
    }
}
