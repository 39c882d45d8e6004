//! kiln-graph - named build tasks as an explicit, validated DAG.
//!
//! Tasks are declared with a [`TaskGraph::builder`], validated once (duplicate
//! names, unknown prerequisites, cycles) and then executed any number of times
//! through a [`Runner`]. A run executes the transitive prerequisite closure of
//! its targets in topological order, each task exactly once, and stops
//! starting new tasks as soon as one fails.
//!
//! # Example
//!
//! ```rust
//! use kiln_graph::{Runner, TaskGraph, TaskOutcome, TaskSpec, task_fn};
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let graph = TaskGraph::builder()
//!     .task(TaskSpec::new("js", task_fn(|| async { Ok(TaskOutcome::Completed) })))
//!     .task(TaskSpec::new("css", task_fn(|| async { Ok(TaskOutcome::Completed) })))
//!     .task(TaskSpec::composite("html", ["js", "css"]))
//!     .build()?;
//!
//! let report = Runner::new(Arc::new(graph)).run(&["html"]).await?;
//! assert!(report.completed_before_started("js", "html"));
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod graph;
pub mod runner;
pub mod task;

pub use error::{GraphError, RunError};
pub use graph::{TaskGraph, TaskGraphBuilder};
pub use runner::{ExecutionReport, Runner, TaskRecord, TraceEvent};
pub use task::{FnTask, Noop, Task, TaskError, TaskOutcome, TaskSpec, task_fn};
