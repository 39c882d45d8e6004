//! Fail-fast concurrent execution of a task plan.

use indexmap::IndexMap;
use petgraph::graph::NodeIndex;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::{Id, JoinSet};
use tracing::{debug, error, info, warn};

use crate::error::RunError;
use crate::graph::TaskGraph;
use crate::task::{TaskError, TaskOutcome};

/// One entry of the execution trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    Started(String),
    Completed(String),
    Failed(String),
}

impl TraceEvent {
    /// Name of the task this event belongs to.
    pub fn task(&self) -> &str {
        match self {
            TraceEvent::Started(name) | TraceEvent::Completed(name) | TraceEvent::Failed(name) => {
                name
            }
        }
    }
}

/// Result of one finished task.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub outcome: TaskOutcome,
    pub duration: Duration,
}

/// What happened during one [`Runner::run`] invocation.
#[derive(Debug, Clone, Default)]
pub struct ExecutionReport {
    /// Events in the order the runner observed them.
    pub trace: Vec<TraceEvent>,
    /// Finished tasks, in completion order.
    pub records: IndexMap<String, TaskRecord>,
    /// Planned tasks that never started because an earlier task failed.
    pub not_started: Vec<String>,
    /// Wall time of the whole run.
    pub elapsed: Duration,
}

impl ExecutionReport {
    /// Position of an event in the trace.
    pub fn position(&self, event: &TraceEvent) -> Option<usize> {
        self.trace.iter().position(|e| e == event)
    }

    /// Whether `first` completed before `second` started.
    pub fn completed_before_started(&self, first: &str, second: &str) -> bool {
        match (
            self.position(&TraceEvent::Completed(first.to_string())),
            self.position(&TraceEvent::Started(second.to_string())),
        ) {
            (Some(done), Some(started)) => done < started,
            _ => false,
        }
    }

    /// Names of tasks that were started, in start order.
    pub fn started(&self) -> Vec<&str> {
        self.trace
            .iter()
            .filter_map(|event| match event {
                TraceEvent::Started(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Outcome of a finished task.
    pub fn outcome(&self, task: &str) -> Option<&TaskOutcome> {
        self.records.get(task).map(|record| &record.outcome)
    }

    /// Every `(task, message)` reported through `CompletedWithErrors`.
    pub fn soft_errors(&self) -> Vec<(&str, &str)> {
        self.records
            .iter()
            .flat_map(|(task, record)| {
                record
                    .outcome
                    .errors()
                    .iter()
                    .map(move |message| (task.as_str(), message.as_str()))
            })
            .collect()
    }

    /// Whether every task completed without reported errors.
    pub fn is_clean(&self) -> bool {
        self.not_started.is_empty() && self.records.values().all(|r| r.outcome.is_clean())
    }
}

/// Executes plans of a [`TaskGraph`].
///
/// Ready tasks are spawned onto the tokio runtime in plan order and run
/// concurrently. Once a task fails no further task is started, but tasks
/// already in flight are awaited to completion.
#[derive(Debug, Clone)]
pub struct Runner {
    graph: Arc<TaskGraph>,
}

impl Runner {
    pub fn new(graph: Arc<TaskGraph>) -> Self {
        Self { graph }
    }

    pub fn graph(&self) -> &Arc<TaskGraph> {
        &self.graph
    }

    /// Run `targets` and everything they transitively depend on, each task once.
    pub async fn run<S: AsRef<str>>(&self, targets: &[S]) -> Result<ExecutionReport, RunError> {
        let started_at = Instant::now();
        let plan = self.graph.plan_nodes(targets)?;
        debug!(
            "Planned {} task(s): {}",
            plan.len(),
            plan.iter()
                .map(|&idx| self.graph.name_of(idx))
                .collect::<Vec<_>>()
                .join(", ")
        );

        let mut waiting_on: FxHashMap<NodeIndex, usize> = plan
            .iter()
            .map(|&idx| (idx, self.graph.prerequisite_nodes(idx).count()))
            .collect();
        let mut pending: Vec<NodeIndex> = plan;
        let mut in_flight: FxHashMap<Id, (NodeIndex, Instant)> = FxHashMap::default();
        let mut join_set: JoinSet<Result<TaskOutcome, TaskError>> = JoinSet::new();
        let mut report = ExecutionReport::default();
        let mut failure: Option<(String, TaskError)> = None;

        loop {
            if failure.is_none() {
                let (ready, blocked): (Vec<_>, Vec<_>) = pending
                    .into_iter()
                    .partition(|idx| waiting_on.get(idx).copied().unwrap_or(0) == 0);
                pending = blocked;

                for idx in ready {
                    let name = self.graph.name_of(idx).to_string();
                    info!("Starting '{}'...", name);
                    report.trace.push(TraceEvent::Started(name));

                    let body = self.graph.body_of(idx);
                    let handle = join_set.spawn(async move { body.run().await });
                    in_flight.insert(handle.id(), (idx, Instant::now()));
                }
            }

            let Some(joined) = join_set.join_next_with_id().await else {
                break;
            };

            let (id, result) = match joined {
                Ok((id, result)) => (id, result),
                Err(join_error) => {
                    let id = join_error.id();
                    let message = if join_error.is_panic() {
                        "task panicked".to_string()
                    } else {
                        "task was cancelled".to_string()
                    };
                    (id, Err(TaskError::from(message)))
                }
            };
            let Some((idx, task_started)) = in_flight.remove(&id) else {
                continue;
            };
            let name = self.graph.name_of(idx).to_string();
            let duration = task_started.elapsed();

            match result {
                Ok(outcome) => {
                    match &outcome {
                        TaskOutcome::Completed => {
                            info!("Finished '{}' after {:?}", name, duration);
                        }
                        TaskOutcome::CompletedWithErrors(errors) => {
                            warn!(
                                "Finished '{}' after {:?} with {} error(s)",
                                name,
                                duration,
                                errors.len()
                            );
                        }
                    }
                    for dependent in self.graph.dependent_nodes(idx) {
                        if let Some(count) = waiting_on.get_mut(&dependent) {
                            *count = count.saturating_sub(1);
                        }
                    }
                    report.trace.push(TraceEvent::Completed(name.clone()));
                    report
                        .records
                        .insert(name, TaskRecord { outcome, duration });
                }
                Err(err) => {
                    error!("'{}' errored after {:?}: {}", name, duration, err);
                    report.trace.push(TraceEvent::Failed(name.clone()));
                    if failure.is_none() {
                        failure = Some((name, err));
                    }
                }
            }
        }

        report.not_started = pending
            .iter()
            .map(|&idx| self.graph.name_of(idx).to_string())
            .collect();
        report.elapsed = started_at.elapsed();

        match failure {
            Some((task, source)) => {
                if !report.not_started.is_empty() {
                    warn!("Not started: {}", report.not_started.join(", "));
                }
                Err(RunError::TaskFailed {
                    task,
                    source,
                    report: Box::new(report),
                })
            }
            None => Ok(report),
        }
    }
}
