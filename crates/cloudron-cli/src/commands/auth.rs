//! Login and logout.

use std::io::Write;

use cloudron_api::{ApiError, CredentialPrompt, TerminalPrompt};
use tracing::info;

use crate::cli::LoginArgs;
use crate::context::Context;
use crate::error::CliError;

/// Handler for `login` and `logout`.
pub struct AuthCommand<'a> {
    ctx: &'a Context,
}

impl<'a> AuthCommand<'a> {
    /// Creates a new auth command handler.
    #[must_use]
    pub const fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    /// Prompt for credentials and store a fresh access token.
    ///
    /// # Errors
    ///
    /// Returns an error if no host is known or the credentials are rejected.
    pub async fn login<W: Write>(&self, out: &mut W, args: &LoginArgs) -> Result<(), CliError> {
        if let Some(host) = &args.cloudron {
            let mut config = self.ctx.config();
            if config.session().host.as_deref() != Some(host.as_str()) {
                config.set_host(host.as_str())?;
                config.clear_token()?;
            }
        }
        let host = self
            .ctx
            .config()
            .session()
            .host
            .ok_or(ApiError::NotConfigured)?;

        let prompt = match &args.username {
            Some(username) => TerminalPrompt::for_user(username.as_str()),
            None => TerminalPrompt::new(),
        };
        let credentials = prompt.credentials(&host)?;
        self.ctx.client().authenticate(&credentials).await?;

        info!(%host, "logged in");
        writeln!(out, "Login successful.")?;
        Ok(())
    }

    /// Forget the stored token.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be written.
    pub fn logout<W: Write>(&self, out: &mut W) -> Result<(), CliError> {
        self.ctx.config().clear_token()?;
        writeln!(out, "Logged out.")?;
        Ok(())
    }
}
