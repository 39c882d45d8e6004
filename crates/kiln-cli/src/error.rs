//! Error handling for the kiln CLI.
//!
//! Library errors (`GraphError`, `RunError`, `PipelineError`) convert into
//! [`CliError`] via `#[from]`; configuration problems get their own
//! [`ConfigError`] with a hint on how to fix them. `main` turns the final
//! error into a miette report.

mod report;

use kiln_graph::{GraphError, RunError};
use kiln_pipeline::PipelineError;
use std::path::PathBuf;
use thiserror::Error;

pub use report::cli_error_to_miette;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The task graph is malformed or a target is unknown
    #[error("Task graph error: {0}")]
    Graph(#[from] GraphError),

    /// A task failed and its dependents never started
    #[error("Build failed: {0}")]
    Build(#[from] RunError),

    /// A pipeline operation failed outside a task run
    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    /// File or directory not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// I/O errors from file system operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Development server errors
    #[error("Server error: {0}")]
    Server(String),

    /// File watching errors
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),
}

/// Configuration-specific errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested config file doesn't exist
    #[error("Config file not found: {}\n\nHint: Create a kiln.toml in the project directory or fix the --config path", .0.display())]
    NotFound(PathBuf),

    /// The project directory doesn't exist
    #[error("Project directory not found: {}\n\nHint: Check the --cwd argument", .0.display())]
    ProjectNotFound(PathBuf),

    /// Invalid value for a configuration option
    #[error("Invalid value for '{field}': {value}\n\nHint: {hint}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The invalid value
        value: String,
        /// Helpful hint for correct values
        hint: String,
    },

    /// Mutually exclusive settings
    #[error("Conflicting options: {0}\n\nHint: These settings cannot be used together")]
    ConflictingOptions(String),
}

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_not_found() {
        let msg = ConfigError::NotFound(PathBuf::from("ci.toml")).to_string();
        assert!(msg.contains("Config file not found"));
        assert!(msg.contains("ci.toml"));
        assert!(msg.contains("Hint:"));
    }

    #[test]
    fn test_config_error_invalid_value() {
        let err = ConfigError::InvalidValue {
            field: "dev.port".to_string(),
            value: "0".to_string(),
            hint: "Use a port between 1 and 65535".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Invalid value for 'dev.port': 0"));
        assert!(msg.contains("Hint: Use a port"));
    }

    #[test]
    fn test_cli_error_from_graph_error() {
        let err: CliError = GraphError::UnknownTask("deploy".to_string()).into();
        assert!(matches!(err, CliError::Graph(_)));
        assert!(err.to_string().contains("unknown task 'deploy'"));
    }
}
