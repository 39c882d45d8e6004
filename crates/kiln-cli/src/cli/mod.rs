//! Command-line interface definition for kiln.
//!
//! kiln has no subcommands: positional arguments name the tasks to run.
//!
//! - `kiln` - run the `default` task
//! - `kiln js css` - run `js` and `css` plus their prerequisites
//! - `kiln watch` - build, then rebuild on every change
//! - `kiln dev` - watch, serve the output with live reload and run the backend
//! - `kiln --list` - print the task graph

mod validation;

use clap::Parser;
use kiln_pipeline::tasks;
use std::path::PathBuf;

pub use validation::{parse_port, parse_task};

/// kiln - task-graph build pipeline for browser applications
#[derive(Parser, Debug)]
#[command(
    name = "kiln",
    version,
    about = "Task-graph build pipeline for browser applications",
    long_about = "kiln compiles TypeScript into one browser bundle, bundles stylesheets,\n\
                  copies templates and vendor files, composes the HTML page and can\n\
                  rebuild on change behind a live-reloading development server."
)]
pub struct Cli {
    /// Tasks to run
    ///
    /// Known tasks: lint, js, css, lib, templates, html, server, server-js,
    /// default, watch, dev. Prerequisites run first, each task once.
    #[arg(value_name = "TASK", value_parser = parse_task)]
    pub tasks: Vec<String>,

    /// Minify bundles and collapse HTML whitespace
    #[arg(long)]
    pub release: bool,

    /// Keep running and rebuild on change (implied by `watch` and `dev`)
    #[arg(short, long)]
    pub watch: bool,

    /// Path to the configuration file
    ///
    /// Defaults to kiln.toml in the project directory when present.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Project directory
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Output directory, overriding the configuration file
    #[arg(short = 'd', long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Dev server port, overriding the configuration file
    #[arg(short, long, value_name = "PORT", value_parser = parse_port)]
    pub port: Option<u16>,

    /// Print every task with its prerequisites and exit
    #[arg(long)]
    pub list: bool,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

impl Cli {
    /// Requested tasks, `default` when none were named.
    pub fn targets(&self) -> Vec<String> {
        if self.tasks.is_empty() {
            vec![tasks::DEFAULT.to_string()]
        } else {
            self.tasks.clone()
        }
    }

    /// Whether this invocation keeps running after the first build.
    pub fn is_watching(&self) -> bool {
        self.watch
            || self
                .targets()
                .iter()
                .any(|t| t == tasks::WATCH || t == tasks::DEV)
    }

    /// Whether the dev server and backend should be started.
    pub fn is_dev(&self) -> bool {
        self.targets().iter().any(|t| t == tasks::DEV)
    }
}
