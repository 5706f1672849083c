//! Cloudron CLI binary entrypoint.
//!
//! This is the main entry point for the `cloudron` command-line tool.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use cloudron_api::client::RunAction;
use tracing_subscriber::EnvFilter;

use cloudron_cli::cli::{Cli, Commands, WaitArgs};
use cloudron_cli::commands::{
    AppsCommand, AuthCommand, BuildCommand, ExecCommand, InstallCommand, LogsCommand,
    VersionsCommand,
};
use cloudron_cli::{CliError, Context, OutputFormat};

fn main() -> ExitCode {
    // Logs go to stderr; stdout carries command output and exec streams.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(run(cli));
    // An exec session leaves a blocked stdin reader behind.
    runtime.shutdown_background();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();

    if let Commands::Versions { selector } = &cli.command {
        let format = OutputFormat::new(cli.format);
        return VersionsCommand::new(&format).execute(&mut stdout, selector.as_deref());
    }

    let ctx = Context::load(&cli)?;
    match &cli.command {
        Commands::Login(args) => AuthCommand::new(&ctx).login(&mut stdout, args).await?,
        Commands::Logout => AuthCommand::new(&ctx).logout(&mut stdout)?,
        Commands::List => AppsCommand::new(&ctx).list(&mut stdout).await?,
        Commands::Status => AppsCommand::new(&ctx).status(&mut stdout).await?,
        Commands::Install(args) => InstallCommand::new(&ctx).install(&mut stdout, args).await?,
        Commands::Uninstall => InstallCommand::new(&ctx).uninstall(&mut stdout).await?,
        Commands::Configure(args) => {
            InstallCommand::new(&ctx).configure(&mut stdout, args).await?;
        }
        Commands::Start => {
            InstallCommand::new(&ctx)
                .run_action(&mut stdout, RunAction::Start, WaitArgs::default())
                .await?;
        }
        Commands::Stop => {
            InstallCommand::new(&ctx)
                .run_action(&mut stdout, RunAction::Stop, WaitArgs::default())
                .await?;
        }
        Commands::Restart(wait) => {
            InstallCommand::new(&ctx)
                .run_action(&mut stdout, RunAction::Restart, *wait)
                .await?;
        }
        Commands::Logs(args) => LogsCommand::new(&ctx).execute(&mut stdout, args).await?,
        Commands::Exec(args) => {
            // Release stdout: the session writes to it directly.
            drop(stdout);
            return ExecCommand::new(&ctx).execute(&mut io::stderr(), args).await;
        }
        Commands::Build => BuildCommand::new(&ctx).build(&mut stdout).await?,
        Commands::Builds => BuildCommand::new(&ctx).list(&mut stdout)?,
        Commands::Versions { .. } => {}
    }

    Ok(())
}
