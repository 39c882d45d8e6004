//! kiln CLI - runs the build task graph once, on every change, or behind a
//! live-reloading dev server.
//!
//! # Architecture
//!
//! - [`cli`] - argument parsing with clap
//! - [`config`] - `kiln.toml` loading and validation
//! - [`commands`] - one-shot runs, watch mode and `--list`
//! - [`watch`] - file watching and the rebuild controller
//! - [`dev`] - live-reload server, backend proxy and backend process
//! - [`error`] - error types with actionable hints
//! - [`logger`] - tracing setup
//! - [`ui`] - terminal status output
//!
//! # Example
//!
//! ```rust,no_run
//! use kiln_cli::{error::Result, logger};
//!
//! fn main() -> Result<()> {
//!     logger::init_logger(false, false, false);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod dev;
pub mod error;
pub mod logger;
pub mod ui;
pub mod watch;

pub use error::{CliError, ConfigError, Result};
