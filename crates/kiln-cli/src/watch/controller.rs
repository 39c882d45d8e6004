//! Rebuild controller: maps changed files to tasks and reload signals.
//!
//! The controller is `Idle` until a change arrives, then `Rebuilding` until
//! the affected tasks finish. Changes that arrive meanwhile wait in the
//! channel and form the next batch, so rebuilds never overlap and a burst
//! of saves costs one extra cycle at most.

use kiln_graph::{ExecutionReport, RunError};
use kiln_pipeline::glob::SourceGlob;
use kiln_pipeline::tasks::{CSS, HTML, JS, SERVER_JS, TEMPLATES};
use kiln_pipeline::{
    BuildMode, PathConfig, Pipeline, PipelineError, ReloadBuffer, ReloadSignal, ReloadSink,
};
use std::collections::BTreeSet;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::Result;
use crate::ui;
use crate::watch::FileChange;

/// What browsers should do once a subscription's tasks finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadKind {
    /// Reload the page.
    Full,
    /// The style task swaps the stylesheet itself.
    Stylesheet,
}

/// A set of watched sources and the tasks they trigger.
#[derive(Debug)]
pub struct Subscription {
    pub name: &'static str,
    sources: SourceGlob,
    pub tasks: &'static [&'static str],
    pub reload: ReloadKind,
    /// Changed files are script modules to evict from the cache.
    pub scripts: bool,
}

impl Subscription {
    fn new<S: AsRef<str>>(
        name: &'static str,
        paths: &PathConfig,
        sources: &[S],
        tasks: &'static [&'static str],
        reload: ReloadKind,
    ) -> std::result::Result<Self, PipelineError> {
        Ok(Self {
            name,
            sources: SourceGlob::new(&paths.root, sources)?,
            tasks,
            reload,
            scripts: false,
        })
    }

    pub fn matches(&self, path: &std::path::Path) -> bool {
        self.sources.matches(path)
    }
}

/// Watch subscriptions for a project, in the order their tasks are queued.
pub fn subscriptions(paths: &PathConfig) -> std::result::Result<Vec<Subscription>, PipelineError> {
    let template = paths.html_template.to_string_lossy().into_owned();

    let mut scripts = Subscription::new(
        "scripts",
        paths,
        &paths.script_sources,
        &[JS, SERVER_JS],
        ReloadKind::Full,
    )?;
    scripts.scripts = true;

    Ok(vec![
        Subscription::new("html", paths, &[template], &[HTML], ReloadKind::Full)?,
        scripts,
        Subscription::new(
            "templates",
            paths,
            &paths.templates.sources,
            &[TEMPLATES],
            ReloadKind::Full,
        )?,
        Subscription::new(
            "styles",
            paths,
            &paths.style_sources,
            &[CSS],
            ReloadKind::Stylesheet,
        )?,
    ])
}

/// Work derived from one set of changed paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    /// Tasks to run, deduplicated, in subscription order.
    pub tasks: Vec<&'static str>,
    /// Whether any matched subscription wants a page reload.
    pub full_reload: bool,
    /// Changed script modules.
    pub scripts: Vec<PathBuf>,
}

impl Batch {
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    Rebuilding,
}

/// Drives rebuilds for watch and dev mode.
pub struct WatchController {
    pipeline: Pipeline,
    subscriptions: Vec<Subscription>,
    /// Signals emitted by tasks during the current cycle.
    buffer: Arc<ReloadBuffer>,
    /// Where the signals of a finished cycle go.
    reload: Arc<dyn ReloadSink>,
    debounce: Duration,
    state: WatchState,
    cycles: usize,
}

impl WatchController {
    pub fn new(
        paths: PathConfig,
        release: bool,
        reload: Arc<dyn ReloadSink>,
        debounce: Duration,
    ) -> Result<Self> {
        let subscriptions = subscriptions(&paths)?;
        let buffer = Arc::new(ReloadBuffer::new());
        let pipeline = Pipeline::new(paths, BuildMode::new(release, true), buffer.clone())?;

        Ok(Self {
            pipeline,
            subscriptions,
            buffer,
            reload,
            debounce,
            state: WatchState::Idle,
            cycles: 0,
        })
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    /// Completed rebuild cycles, the initial build excluded.
    pub fn cycles(&self) -> usize {
        self.cycles
    }

    /// Map changed paths to a batch. Unwatched paths are ignored.
    pub fn plan(&self, changed: &[PathBuf]) -> Batch {
        let mut batch = Batch::default();
        for subscription in &self.subscriptions {
            let hits: Vec<&PathBuf> = changed.iter().filter(|p| subscription.matches(p)).collect();
            if hits.is_empty() {
                continue;
            }
            debug!("{} changed: {} file(s)", subscription.name, hits.len());

            for &task in subscription.tasks {
                if !batch.tasks.contains(&task) {
                    batch.tasks.push(task);
                }
            }
            batch.full_reload |= subscription.reload == ReloadKind::Full;
            if subscription.scripts {
                batch.scripts.extend(hits.into_iter().cloned());
            }
        }
        batch
    }

    /// Run the first build; its reload signals are dropped.
    pub async fn initial_build<S: AsRef<str>>(
        &mut self,
        targets: &[S],
    ) -> std::result::Result<ExecutionReport, RunError> {
        let result = self.pipeline.run(targets).await;
        self.buffer.drain();
        result
    }

    /// Rebuild for one batch of changed paths and forward reload signals.
    ///
    /// Errors end the cycle only; the controller returns to `Idle` either way.
    /// A cycle with compile errors leaves the previous output in place and
    /// sends nothing, so browsers keep the last good page.
    pub async fn rebuild(&mut self, changed: &[PathBuf]) -> Option<ExecutionReport> {
        let batch = self.plan(changed);
        if batch.is_empty() {
            debug!("No task watches {} changed path(s)", changed.len());
            return None;
        }

        self.state = WatchState::Rebuilding;
        for script in &batch.scripts {
            self.pipeline.script_cache().invalidate(script);
        }

        let result = self.pipeline.run(&batch.tasks).await;
        let signals = self.buffer.drain();
        self.cycles += 1;
        self.state = WatchState::Idle;

        match result {
            Ok(report) => {
                if !report.is_clean() {
                    debug!("Dropping {} reload signal(s) after errors", signals.len());
                } else if batch.full_reload {
                    self.reload.send(ReloadSignal::FullReload);
                } else {
                    for signal in signals {
                        self.reload.send(signal);
                    }
                }

                let summary = format!(
                    "Rebuilt {} in {}",
                    batch.tasks.join(", "),
                    ui::format_duration(report.elapsed)
                );
                if report.is_clean() {
                    ui::success(&summary);
                } else {
                    ui::warning(&format!(
                        "{} with {} error(s)",
                        summary,
                        report.soft_errors().len()
                    ));
                }
                Some(report)
            }
            Err(err) => {
                ui::error(&format!("Rebuild failed: {}", err));
                None
            }
        }
    }

    /// Rebuild on every batch of changes until `shutdown` resolves or the
    /// change channel closes.
    pub async fn run<F>(&mut self, changes: &mut mpsc::Receiver<FileChange>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let first = tokio::select! {
                change = changes.recv() => match change {
                    Some(change) => change,
                    None => break,
                },
                _ = &mut shutdown => break,
            };

            let changed = self.collect_batch(first, changes).await;
            self.rebuild(&changed).await;
        }
    }

    /// Gather `first` plus everything that arrives within the settle window.
    async fn collect_batch(
        &self,
        first: FileChange,
        changes: &mut mpsc::Receiver<FileChange>,
    ) -> Vec<PathBuf> {
        let mut paths = BTreeSet::from([first.path().to_path_buf()]);
        let settle = tokio::time::sleep(self.debounce);
        tokio::pin!(settle);

        loop {
            tokio::select! {
                Some(change) = changes.recv() => {
                    paths.insert(change.path().to_path_buf());
                }
                _ = &mut settle => break,
            }
        }

        paths.into_iter().collect()
    }
}
