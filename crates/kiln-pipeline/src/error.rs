//! Error types for kiln-pipeline.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors raised by build tasks.
///
/// `Compile` is the only variant the script and style tasks swallow (they log
/// it and report a soft failure); everything else propagates through the task
/// graph and halts dependents.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// I/O error with the file it happened on.
    #[error("{action} '{}': {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Source code failed to parse, transpile or bundle.
    #[error("{}", format_compile_errors(.diagnostics))]
    Compile { diagnostics: Vec<String> },

    /// A glob pattern could not be compiled.
    #[error("Invalid glob pattern '{pattern}': {message}")]
    Glob { pattern: String, message: String },

    /// An output path would land outside the output directory.
    #[error("Invalid output path: {0}")]
    InvalidOutputPath(String),

    /// A required input file is missing.
    #[error("Input not found: {}", .0.display())]
    MissingInput(PathBuf),

    /// A browser target such as `"chrome 80"` could not be parsed.
    #[error("Invalid browser target '{0}'")]
    InvalidTarget(String),

    /// The rolldown bundler could not be configured.
    #[error("Bundler setup failed: {0}")]
    Bundler(String),

    /// Blocking work moved off the async runtime panicked or was cancelled.
    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl PipelineError {
    /// Attach a path and action to an I/O error.
    pub fn io(action: &'static str, path: impl AsRef<Path>, source: std::io::Error) -> Self {
        PipelineError::Io {
            action,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// A compile error from a single message.
    pub fn compile(message: impl Into<String>) -> Self {
        PipelineError::Compile {
            diagnostics: vec![message.into()],
        }
    }

    /// Whether this error is a compile failure (fatal to the cycle only).
    pub fn is_compile(&self) -> bool {
        matches!(self, PipelineError::Compile { .. })
    }

    /// Diagnostics carried by a compile error.
    pub fn diagnostics(&self) -> Vec<String> {
        match self {
            PipelineError::Compile { diagnostics } => diagnostics.clone(),
            other => vec![other.to_string()],
        }
    }
}

fn format_compile_errors(diagnostics: &[String]) -> String {
    match diagnostics {
        [] => "Compilation failed".to_string(),
        [single] => single.clone(),
        many => format!("{} errors:\n{}", many.len(), many.join("\n")),
    }
}
