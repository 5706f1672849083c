//! App logs.

use std::io::Write;

use crate::cli::LogsArgs;
use crate::context::Context;
use crate::error::CliError;

/// Handler for `logs`.
pub struct LogsCommand<'a> {
    ctx: &'a Context,
}

impl<'a> LogsCommand<'a> {
    /// Creates a new logs command handler.
    #[must_use]
    pub const fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    /// Print recent log lines of the selected app, following if asked.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the stream breaks.
    pub async fn execute<W: Write>(&self, out: &mut W, args: &LogsArgs) -> Result<(), CliError> {
        let app_id = self.ctx.select_app().await?;
        let client = self.ctx.client();
        if args.follow {
            client.follow_logs(&app_id, args.lines, out).await?;
        } else {
            client.print_logs(&app_id, args.lines, out).await?;
        }
        Ok(())
    }
}
