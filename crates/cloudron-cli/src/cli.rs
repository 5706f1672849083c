//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Cloudron CLI - install, inspect and develop apps on a Cloudron.
#[derive(Parser, Debug, Clone)]
#[command(name = "cloudron")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Cloudron to talk to, e.g. `my.example.com`.
    #[arg(long, env = "CLOUDRON_HOST", global = true)]
    pub host: Option<String>,

    /// Configuration file (default `~/.cloudron.json`).
    #[arg(long, env = "CLOUDRON_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// App id; defaults to the app remembered for the current directory.
    #[arg(short, long, global = true)]
    pub app: Option<String>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = Format::Table, global = true)]
    pub format: Format,

    /// Accept invalid TLS certificates (self-signed test boxes).
    #[arg(long, global = true)]
    pub allow_selfsigned: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Log in to a Cloudron and store the access token.
    Login(LoginArgs),

    /// Forget the stored access token.
    Logout,

    /// List installed apps.
    List,

    /// Show the state of the selected app.
    Status,

    /// Install an app from the app store.
    Install(InstallArgs),

    /// Uninstall the selected app.
    Uninstall,

    /// Move the selected app to another location.
    Configure(ConfigureArgs),

    /// Start the selected app.
    Start,

    /// Stop the selected app.
    Stop,

    /// Restart the selected app.
    Restart(WaitArgs),

    /// Show the logs of the selected app.
    Logs(LogsArgs),

    /// Run a command inside the selected app.
    ///
    /// Without a command an interactive shell is started.
    Exec(ExecArgs),

    /// Build the app in the current directory on the build service.
    Build,

    /// List builds of the app in the current directory.
    Builds,

    /// List known Cloudron releases, or resolve one.
    Versions {
        /// Release selector, e.g. `latest` or `0.0.66`.
        selector: Option<String>,
    },
}

/// Arguments for the login command.
#[derive(Args, Debug, Clone)]
pub struct LoginArgs {
    /// Cloudron to log in to; defaults to `--host` or the stored host.
    pub cloudron: Option<String>,

    /// Username; prompted for when omitted.
    #[arg(short, long)]
    pub username: Option<String>,
}

/// Arguments for the install command.
#[derive(Args, Debug, Clone)]
pub struct InstallArgs {
    /// App store id, e.g. `io.example.app`.
    pub appstore_id: String,

    /// Subdomain to install at; prompted for when omitted.
    #[arg(short, long)]
    pub location: Option<String>,

    /// Port bindings (NAME=PORT).
    #[arg(short, long = "port", value_name = "NAME=PORT")]
    pub ports: Vec<String>,

    /// Waiting behaviour.
    #[command(flatten)]
    pub wait: WaitArgs,
}

/// Arguments for the configure command.
#[derive(Args, Debug, Clone)]
pub struct ConfigureArgs {
    /// New subdomain.
    #[arg(short, long)]
    pub location: String,

    /// Waiting behaviour.
    #[command(flatten)]
    pub wait: WaitArgs,
}

/// How long to wait after a state change.
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct WaitArgs {
    /// Also wait until the app passes its health check.
    #[arg(long)]
    pub wait_health: bool,
}

/// Arguments for the logs command.
#[derive(Args, Debug, Clone)]
pub struct LogsArgs {
    /// Keep printing new lines.
    #[arg(short, long)]
    pub follow: bool,

    /// Number of past lines to show.
    #[arg(short = 'n', long, default_value_t = cloudron_api::logs::DEFAULT_LINES)]
    pub lines: u32,
}

/// Arguments for the exec command.
#[derive(Args, Debug, Clone)]
pub struct ExecArgs {
    /// Command and arguments to run.
    #[arg(last = true)]
    pub command: Vec<String>,
}
