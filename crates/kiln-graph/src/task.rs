//! Task bodies and task descriptors.

use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Error type returned by task bodies.
///
/// Task bodies live in other crates with their own error enums, so the graph
/// only requires a boxed `std::error::Error`.
pub type TaskError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Completion signal of a task body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The task did its work.
    Completed,
    /// The task hit errors it already reported, but still signals completion so
    /// dependents and long-lived watch loops keep going.
    CompletedWithErrors(Vec<String>),
}

impl TaskOutcome {
    /// `true` for [`TaskOutcome::Completed`].
    pub fn is_clean(&self) -> bool {
        matches!(self, TaskOutcome::Completed)
    }

    /// Messages carried by a [`TaskOutcome::CompletedWithErrors`].
    pub fn errors(&self) -> &[String] {
        match self {
            TaskOutcome::Completed => &[],
            TaskOutcome::CompletedWithErrors(errors) => errors,
        }
    }

    /// Build an outcome from a list of reported errors.
    pub fn from_errors(errors: Vec<String>) -> Self {
        if errors.is_empty() {
            TaskOutcome::Completed
        } else {
            TaskOutcome::CompletedWithErrors(errors)
        }
    }
}

/// An asynchronous unit of work.
#[async_trait]
pub trait Task: Send + Sync {
    /// Run the task body once.
    async fn run(&self) -> Result<TaskOutcome, TaskError>;
}

/// Body of a composite task: does nothing, only carries prerequisites.
#[derive(Debug, Clone, Copy, Default)]
pub struct Noop;

#[async_trait]
impl Task for Noop {
    async fn run(&self) -> Result<TaskOutcome, TaskError> {
        Ok(TaskOutcome::Completed)
    }
}

/// Adapter turning an async closure into a [`Task`].
pub struct FnTask<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Task for FnTask<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<TaskOutcome, TaskError>> + Send + 'static,
{
    async fn run(&self) -> Result<TaskOutcome, TaskError> {
        (self.f)().await
    }
}

/// Wrap an async closure as a task body.
///
/// ```
/// use kiln_graph::{task_fn, TaskOutcome};
///
/// let task = task_fn(|| async { Ok(TaskOutcome::Completed) });
/// # let _ = task;
/// ```
pub fn task_fn<F, Fut>(f: F) -> FnTask<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<TaskOutcome, TaskError>> + Send + 'static,
{
    FnTask { f }
}

/// A named task with its prerequisite names.
#[derive(Clone)]
pub struct TaskSpec {
    pub name: String,
    pub deps: Vec<String>,
    pub task: Arc<dyn Task>,
}

impl TaskSpec {
    /// Create a task with no prerequisites.
    pub fn new(name: impl Into<String>, task: impl Task + 'static) -> Self {
        Self {
            name: name.into(),
            deps: Vec::new(),
            task: Arc::new(task),
        }
    }

    /// Create a composite task: a [`Noop`] body that only orders its prerequisites.
    pub fn composite<I, S>(name: impl Into<String>, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(name, Noop).with_deps(deps)
    }

    /// Replace the prerequisite list.
    pub fn with_deps<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deps = deps.into_iter().map(Into::into).collect();
        self
    }
}

impl fmt::Debug for TaskSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskSpec")
            .field("name", &self.name)
            .field("deps", &self.deps)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_from_errors() {
        assert_eq!(TaskOutcome::from_errors(vec![]), TaskOutcome::Completed);

        let outcome = TaskOutcome::from_errors(vec!["bad".to_string()]);
        assert!(!outcome.is_clean());
        assert_eq!(outcome.errors(), ["bad".to_string()]);
    }

    #[test]
    fn test_composite_spec() {
        let spec = TaskSpec::composite("default", ["html", "lib"]);
        assert_eq!(spec.name, "default");
        assert_eq!(spec.deps, vec!["html".to_string(), "lib".to_string()]);
    }

    #[tokio::test]
    async fn test_fn_task_runs_closure() {
        let task = task_fn(|| async { Ok(TaskOutcome::CompletedWithErrors(vec!["x".into()])) });
        let outcome = task.run().await.unwrap();
        assert_eq!(outcome.errors().len(), 1);
    }
}
