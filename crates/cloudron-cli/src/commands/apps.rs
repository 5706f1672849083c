//! App listing and status.

use std::io::Write;

use crate::context::Context;
use crate::error::CliError;
use crate::output::{AppDetail, AppList};

/// Handler for `list` and `status`.
pub struct AppsCommand<'a> {
    ctx: &'a Context,
}

impl<'a> AppsCommand<'a> {
    /// Creates a new apps command handler.
    #[must_use]
    pub const fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    /// List installed apps.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or output fails.
    pub async fn list<W: Write>(&self, out: &mut W) -> Result<(), CliError> {
        let apps = self.ctx.client().list_apps().await?;
        self.ctx.format().write(out, &AppList { apps })
    }

    /// Show the selected app.
    ///
    /// # Errors
    ///
    /// Returns an error if no app can be selected or the request fails.
    pub async fn status<W: Write>(&self, out: &mut W) -> Result<(), CliError> {
        let app_id = self.ctx.select_app().await?;
        let app = self.ctx.client().app(&app_id).await?;
        self.ctx.format().write(out, &AppDetail { app })
    }
}
