//! Install, uninstall, configure and run state changes.

use std::collections::BTreeMap;
use std::io::Write;

use cloudron_api::ProgressPoller;
use cloudron_api::client::RunAction;
use cloudron_api::prompt::read_line;
use serde_json::json;
use tracing::info;

use crate::cli::{ConfigureArgs, InstallArgs, WaitArgs};
use crate::context::Context;
use crate::error::CliError;

/// Handler for commands that change what runs on the Cloudron.
pub struct InstallCommand<'a> {
    ctx: &'a Context,
}

impl<'a> InstallCommand<'a> {
    /// Creates a new install command handler.
    #[must_use]
    pub const fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    /// Install an app store app and wait until it is ready.
    ///
    /// The new app is remembered for the working directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or installation fails.
    pub async fn install<W: Write>(&self, out: &mut W, args: &InstallArgs) -> Result<(), CliError> {
        let port_bindings = parse_port_bindings(&args.ports)?;
        let location = match &args.location {
            Some(location) => location.clone(),
            None => read_line("Location: ")?,
        };

        let request = json!({
            "appStoreId": args.appstore_id,
            "location": location,
            "portBindings": port_bindings,
        });
        let app_id = self.ctx.client().install(&request).await?;
        info!(%app_id, appstore_id = %args.appstore_id, "installation started");
        self.ctx.config().set_app_for_dir(self.ctx.cwd(), app_id.as_str())?;

        self.wait(&app_id, args.wait, out).await?;
        writeln!(out, "App is installed at {location}")?;
        Ok(())
    }

    /// Uninstall the selected app and wait until it is gone.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or uninstalling fails.
    pub async fn uninstall<W: Write>(&self, out: &mut W) -> Result<(), CliError> {
        let app_id = self.ctx.select_app().await?;
        self.ctx.client().uninstall(&app_id).await?;
        ProgressPoller::new(self.ctx.client())
            .wait_for_removal(&app_id, out)
            .await?;
        self.ctx.config().forget_app(&app_id)?;
        writeln!(out, "App uninstalled.")?;
        Ok(())
    }

    /// Move the selected app and wait until it is reconfigured.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or reconfiguration fails.
    pub async fn configure<W: Write>(
        &self,
        out: &mut W,
        args: &ConfigureArgs,
    ) -> Result<(), CliError> {
        let app_id = self.ctx.select_app().await?;
        self.ctx.client().configure(&app_id, &args.location).await?;
        self.wait(&app_id, args.wait, out).await?;
        writeln!(out, "App is now at {}", args.location)?;
        Ok(())
    }

    /// Start, stop or restart the selected app.
    ///
    /// Only restarts wait for the app to come back.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn run_action<W: Write>(
        &self,
        out: &mut W,
        action: RunAction,
        wait: WaitArgs,
    ) -> Result<(), CliError> {
        let app_id = self.ctx.select_app().await?;
        self.ctx.client().run_action(&app_id, action).await?;
        if action == RunAction::Restart {
            self.wait(&app_id, wait, out).await?;
        }
        writeln!(out, "App {}: {} requested.", app_id, action.as_str())?;
        Ok(())
    }

    async fn wait<W: Write>(&self, app_id: &str, wait: WaitArgs, out: &mut W) -> Result<(), CliError> {
        ProgressPoller::new(self.ctx.client())
            .wait_for_installation(app_id, wait.wait_health, out)
            .await?;
        Ok(())
    }
}

/// Parse `NAME=PORT` pairs.
///
/// # Errors
///
/// Returns `InvalidArgument` for pairs without `=` or with an invalid port.
pub fn parse_port_bindings(pairs: &[String]) -> Result<BTreeMap<String, u16>, CliError> {
    pairs
        .iter()
        .map(|pair| {
            let (name, port) = pair
                .split_once('=')
                .ok_or_else(|| CliError::InvalidArgument(format!("expected NAME=PORT, got {pair}")))?;
            let port = port
                .trim()
                .parse::<u16>()
                .map_err(|e| CliError::InvalidArgument(format!("invalid port in {pair}: {e}")))?;
            Ok((name.trim().to_string(), port))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn port_bindings_parse() {
        let ports = parse_port_bindings(&["SSH_PORT=2222".into(), "SMTP = 25".into()])
            .expect("ports");
        assert_eq!(ports.get("SSH_PORT"), Some(&2222));
        assert_eq!(ports.get("SMTP"), Some(&25));
    }

    #[test]
    fn port_bindings_empty() {
        assert!(parse_port_bindings(&[]).expect("ports").is_empty());
    }

    #[test_case("SSH_PORT" ; "missing separator")]
    #[test_case("SSH_PORT=ssh" ; "not a number")]
    #[test_case("SSH_PORT=70000" ; "out of range")]
    fn port_bindings_invalid(pair: &str) {
        let err = parse_port_bindings(&[pair.to_string()]).expect_err("invalid");
        assert!(matches!(err, CliError::InvalidArgument(_)));
    }
}
