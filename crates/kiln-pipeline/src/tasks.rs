//! The kiln task graph.

use kiln_graph::{ExecutionReport, GraphError, RunError, Runner, TaskGraph, TaskSpec};
use std::sync::Arc;

use crate::copy::{CopyTask, TranspileTask};
use crate::html::HtmlComposer;
use crate::lint::{LintOptions, LintTask};
use crate::mode::BuildMode;
use crate::paths::PathConfig;
use crate::reload::ReloadSink;
use crate::script::{ScriptBuilder, ScriptCache};
use crate::style::StyleBuilder;

pub const LINT: &str = "lint";
pub const JS: &str = "js";
pub const CSS: &str = "css";
pub const LIB: &str = "lib";
pub const TEMPLATES: &str = "templates";
pub const HTML: &str = "html";
pub const SERVER: &str = "server";
pub const SERVER_JS: &str = "server-js";
pub const DEFAULT: &str = "default";
pub const WATCH: &str = "watch";
pub const DEV: &str = "dev";

/// Every task name, in declaration order.
pub const ALL: &[&str] = &[
    LINT, JS, CSS, LIB, TEMPLATES, HTML, SERVER, SERVER_JS, DEFAULT, WATCH, DEV,
];

/// Build the task graph for one invocation.
pub fn build_graph(
    paths: &Arc<PathConfig>,
    mode: BuildMode,
    cache: &Arc<ScriptCache>,
    reload: &Arc<dyn ReloadSink>,
) -> Result<TaskGraph, GraphError> {
    let lint = LintOptions {
        max_line_length: paths.max_line_length,
    };

    TaskGraph::builder()
        .task(TaskSpec::new(LINT, LintTask::new(Arc::clone(paths), lint)))
        .task(TaskSpec::new(JS, ScriptBuilder::new(Arc::clone(cache))))
        .task(TaskSpec::new(
            CSS,
            StyleBuilder::new(Arc::clone(paths), mode, Arc::clone(reload)),
        ))
        .task(TaskSpec::new(
            LIB,
            CopyTask::new(LIB, Arc::clone(paths), paths.lib.clone()),
        ))
        .task(TaskSpec::new(
            TEMPLATES,
            CopyTask::new(TEMPLATES, Arc::clone(paths), paths.templates.clone()),
        ))
        .task(TaskSpec::new(HTML, HtmlComposer::new(Arc::clone(paths), mode)).with_deps([JS, CSS]))
        .task(TaskSpec::new(
            SERVER,
            CopyTask::new(SERVER, Arc::clone(paths), paths.server.clone()),
        ))
        .task(TaskSpec::new(
            SERVER_JS,
            TranspileTask::new(Arc::clone(paths), paths.server_js.clone()),
        ))
        .task(TaskSpec::composite(
            DEFAULT,
            [HTML, LIB, TEMPLATES, SERVER, SERVER_JS],
        ))
        .task(TaskSpec::composite(WATCH, [DEFAULT]))
        .task(TaskSpec::composite(DEV, [WATCH]))
        .build()
}

/// The orchestrator: owns the graph, the script cache and the reload sink.
pub struct Pipeline {
    paths: Arc<PathConfig>,
    mode: BuildMode,
    cache: Arc<ScriptCache>,
    runner: Runner,
}

impl Pipeline {
    pub fn new(
        paths: PathConfig,
        mode: BuildMode,
        reload: Arc<dyn ReloadSink>,
    ) -> Result<Self, GraphError> {
        let paths = Arc::new(paths);
        let cache = Arc::new(ScriptCache::new(Arc::clone(&paths), mode));
        let graph = build_graph(&paths, mode, &cache, &reload)?;

        Ok(Self {
            paths,
            mode,
            cache,
            runner: Runner::new(Arc::new(graph)),
        })
    }

    pub fn paths(&self) -> &Arc<PathConfig> {
        &self.paths
    }

    pub fn mode(&self) -> BuildMode {
        self.mode
    }

    pub fn graph(&self) -> &TaskGraph {
        self.runner.graph()
    }

    pub fn script_cache(&self) -> &Arc<ScriptCache> {
        &self.cache
    }

    /// Run `targets` and their prerequisites.
    pub async fn run<S: AsRef<str>>(&self, targets: &[S]) -> Result<ExecutionReport, RunError> {
        self.runner.run(targets).await
    }
}
