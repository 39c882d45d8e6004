//! Miette diagnostic conversion for CLI errors.

use kiln_graph::{GraphError, RunError};
use miette::Report;

use crate::error::CliError;

/// Convert a [`CliError`] into a miette report for the final exit.
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Build(e) => run_error_to_miette(e),
        CliError::Graph(e) => graph_error_to_miette(e),
        CliError::Config(e) => miette::miette!("Configuration error: {}", e),
        _ => miette::miette!("{}", err),
    }
}

fn run_error_to_miette(err: RunError) -> Report {
    match err {
        RunError::TaskFailed {
            task,
            source,
            report,
        } => {
            let skipped = if report.not_started.is_empty() {
                String::new()
            } else {
                format!("\nNot started: {}", report.not_started.join(", "))
            };
            miette::miette!("Task '{}' failed: {}{}", task, source, skipped)
        }
        RunError::Graph(e) => graph_error_to_miette(e),
    }
}

fn graph_error_to_miette(err: GraphError) -> Report {
    match err {
        GraphError::UnknownTask(name) => miette::miette!(
            "Unknown task '{}'\n\nHint: Run 'kiln --list' to see the available tasks",
            name
        ),
        other => miette::miette!("Invalid task graph: {}", other),
    }
}
