//! Command implementations for the kiln CLI.
//!
//! - [`run`] - run the requested tasks once
//! - [`watch`] - rebuild on change, optionally behind the dev server
//! - [`list`] - print the task graph
//!
//! Each module provides an `execute` function taking the parsed arguments.

pub mod list;
pub mod run;
pub mod watch;

pub use list::execute as list_execute;
pub use run::execute as run_execute;
pub use watch::execute as watch_execute;
