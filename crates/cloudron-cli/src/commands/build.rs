//! Source builds and build history.

use std::io::Write;

use cloudron_api::BuildService;
use cloudron_api::build::archive_dir;
use cloudron_config::BuildRecord;
use tracing::{debug, info};

use crate::context::Context;
use crate::error::CliError;
use crate::output::BuildList;

/// Handler for `build` and `builds`.
pub struct BuildCommand<'a> {
    ctx: &'a Context,
}

impl<'a> BuildCommand<'a> {
    /// Creates a new build command handler.
    #[must_use]
    pub const fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    /// Build the working directory and record the resulting image.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory has no manifest, the upload fails or
    /// the build fails.
    pub async fn build<W: Write>(&self, out: &mut W) -> Result<(), CliError> {
        let project = self.ctx.project_id()?;
        let archive = archive_dir(self.ctx.cwd())?;
        debug!(%project, bytes = archive.len(), "source archived");

        let service = BuildService::new(self.ctx.client());
        let build_id = service.submit(archive).await?;
        self.ctx
            .config()
            .add_build(&project, BuildRecord::submitted(build_id.as_str()))?;
        writeln!(out, "Build {build_id} submitted")?;

        service.follow_log(&build_id, out).await?;
        let image = service.wait(&build_id).await?;
        self.ctx
            .config()
            .complete_build(&project, &build_id, image.as_str())?;

        info!(%project, %build_id, %image, "build finished");
        writeln!(out, "Built {image}")?;
        Ok(())
    }

    /// List recorded builds of the working directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory has no manifest or output fails.
    pub fn list<W: Write>(&self, out: &mut W) -> Result<(), CliError> {
        let project = self.ctx.project_id()?;
        let builds = self.ctx.config().builds(&project).to_vec();
        self.ctx.format().write(out, &BuildList { project, builds })
    }
}
