//! Remote commands.

use std::io::Write;

use cloudron_api::{ExecOutcome, ExecRequest, ExecSession, LocalTerminal, TerminalControl};
use tracing::debug;

use crate::cli::ExecArgs;
use crate::context::Context;
use crate::error::CliError;

/// Terminal size assumed when the real one cannot be read.
const FALLBACK_SIZE: (u16, u16) = (24, 80);

/// Handler for `exec`.
pub struct ExecCommand<'a> {
    ctx: &'a Context,
}

impl<'a> ExecCommand<'a> {
    /// Creates a new exec command handler.
    #[must_use]
    pub const fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    /// Run a command in the selected app, wired to this terminal.
    ///
    /// Notices go to `notices`; stdout carries the remote stream.
    ///
    /// # Errors
    ///
    /// Returns an error if stdin is not a terminal, the server refuses the
    /// session, or the connection breaks.
    pub async fn execute<W: Write>(&self, notices: &mut W, args: &ExecArgs) -> Result<(), CliError> {
        let terminal = LocalTerminal;
        if !terminal.is_tty() {
            return Err(cloudron_api::ApiError::NotATerminal.into());
        }

        let app_id = self.ctx.select_app().await?;
        let (rows, cols) = terminal.size().unwrap_or(FALLBACK_SIZE);
        let request = ExecRequest::new(app_id, args.command.clone(), rows, cols);

        match ExecSession::new(self.ctx.client()).run(&terminal, &request).await? {
            ExecOutcome::Closed => debug!("exec session closed"),
            ExecOutcome::FeatureDisabled => {
                writeln!(
                    notices,
                    "exec is not available: turn on developer mode in the Cloudron settings"
                )?;
            }
        }
        Ok(())
    }
}
