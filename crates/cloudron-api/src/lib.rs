//! Cloudron REST client.
//!
//! This crate implements the networked half of the Cloudron CLI:
//! - [`client::ApiClient`]: requests with transparent re-authentication
//! - [`poller::ProgressPoller`]: installation progress tracking
//! - [`exec::ExecSession`]: remote commands over an upgraded HTTP connection
//! - [`stream`]: event-stream decoding and build log rendering
//! - [`build::BuildService`]: source builds and their logs
//! - [`logs`]: app logs, one shot or followed
//! - [`releases`]: pinned Cloudron releases
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  send(builder)  ┌───────────┐  execute  ┌───────────┐
//! │ poller/exec/ │────────────────►│ ApiClient │──────────►│ Transport │──► Cloudron
//! │ build        │                 └─────┬─────┘           └───────────┘
//! └──────────────┘                 401   │ prompt + login
//!                                        ▼
//!                                  cloudron_config::Config
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod build;
pub mod client;
pub mod error;
pub mod exec;
pub mod logs;
pub mod poller;
pub mod prompt;
pub mod releases;
pub mod stream;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

pub use client::{ApiClient, RequestContext};
pub use error::{ApiError, Result};
pub use build::BuildService;
pub use exec::{ExecOutcome, ExecRequest, ExecSession, LocalTerminal, TerminalControl};
pub use poller::{AppStatusSource, ProgressPoller};
pub use prompt::{CredentialPrompt, Credentials, TerminalPrompt};
pub use transport::{HttpTransport, Transport};
pub use types::{App, BuildStatus};
