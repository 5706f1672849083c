//! # cloudron-cli
//!
//! Cloudron command-line interface.
//!
//! Provides commands for:
//! - Logging in to a Cloudron
//! - Installing, configuring and removing apps
//! - Reading app logs and running commands inside apps
//! - Building apps from source
//!
//! # Architecture
//!
//! Every command receives a [`context::Context`] holding the loaded
//! configuration and a [`cloudron_api::ApiClient`] bound to it.
//!
//! ```text
//! ┌──────────────┐   REST / upgrade   ┌──────────┐
//! │ cloudron-cli │◄──────────────────►│ Cloudron │
//! └──────┬───────┘                    └──────────┘
//!        │ load / save
//!        ▼
//!  ~/.cloudron.json
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod context;
pub mod error;
pub mod output;

pub use cli::{Cli, Commands, Format};
pub use context::Context;
pub use error::CliError;
pub use output::OutputFormat;
