//! Error types for kiln-graph.

use thiserror::Error;

use crate::runner::ExecutionReport;
use crate::task::TaskError;

/// Result type for graph construction and planning.
pub type Result<T, E = GraphError> = std::result::Result<T, E>;

/// Errors detected while building or querying a [`TaskGraph`](crate::TaskGraph).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    /// Two tasks were registered under the same name.
    #[error("task '{0}' is declared more than once")]
    DuplicateTask(String),

    /// A task names a prerequisite that was never registered.
    #[error("task '{task}' depends on unknown task '{prerequisite}'")]
    UnknownPrerequisite { task: String, prerequisite: String },

    /// A task lists itself as a prerequisite.
    #[error("task '{0}' depends on itself")]
    SelfDependency(String),

    /// The prerequisite edges form a cycle.
    #[error("dependency cycle detected: {}", .path.join(" -> "))]
    Cycle {
        /// Task names along the cycle; the first name is repeated at the end.
        path: Vec<String>,
    },

    /// A run or plan targeted a task that does not exist.
    #[error("unknown task '{0}'")]
    UnknownTask(String),
}

/// Errors produced by [`Runner::run`](crate::Runner::run).
#[derive(Debug, Error)]
pub enum RunError {
    /// The requested targets could not be planned.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A task body returned an error; dependents were never started.
    #[error("task '{task}' failed: {source}")]
    TaskFailed {
        task: String,
        #[source]
        source: TaskError,
        /// Trace of the aborted run, including the tasks that never started.
        report: Box<ExecutionReport>,
    },
}

impl RunError {
    /// The execution report of a failed run, if the run got far enough to start tasks.
    pub fn report(&self) -> Option<&ExecutionReport> {
        match self {
            RunError::TaskFailed { report, .. } => Some(report),
            RunError::Graph(_) => None,
        }
    }
}
