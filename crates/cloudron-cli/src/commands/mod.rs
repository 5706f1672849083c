//! CLI command implementations.
//!
//! Each submodule implements a group of commands:
//! - [`auth`] - Login and logout
//! - [`apps`] - App listing and status
//! - [`install`] - Install, uninstall, configure and run state changes
//! - [`logs`] - App logs
//! - [`exec`] - Remote commands
//! - [`build`] - Source builds and build history
//! - [`versions`] - Release resolution

pub mod apps;
pub mod auth;
pub mod build;
pub mod exec;
pub mod install;
pub mod logs;
pub mod versions;

pub use apps::AppsCommand;
pub use auth::AuthCommand;
pub use build::BuildCommand;
pub use exec::ExecCommand;
pub use install::InstallCommand;
pub use logs::LogsCommand;
pub use versions::VersionsCommand;
