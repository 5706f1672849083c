//! Persisted configuration for the Cloudron CLI.
//!
//! The CLI keeps a single JSON document (by default `~/.cloudron.json`) holding:
//! - the Cloudron host and the developer token of the active [`Session`]
//! - the app id chosen for each working directory
//! - the build history ([`BuildRecord`]) of each project, keyed by manifest id
//!
//! The document is loaded once at process start with [`Config::load`] and written
//! back by every mutating call.
//!
//! # Example
//!
//! ```rust,no_run
//! use cloudron_config::Config;
//!
//! # fn example() -> cloudron_config::Result<()> {
//! let mut config = Config::load(Config::default_path()?)?;
//! config.set_host("my.example.com")?;
//! println!("api endpoint: {:?}", config.session().api_endpoint());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod session;
pub mod store;

pub use error::{ConfigError, Result};
pub use session::Session;
pub use store::{BuildRecord, Config};
