//! Script builder: TypeScript entry point to one browser bundle.
//!
//! Project modules are compiled one at a time by oxc (see [`transpile`]) and
//! handed to rolldown through [`TranspilePlugin`], which answers from the
//! shared [`ScriptCache`]. The bundle and its source map are written only
//! after rolldown succeeds, so a compile error leaves the previous bundle on
//! disk.

mod bundle;
pub mod cache;
pub mod plugin;
pub mod transpile;

use async_trait::async_trait;
use kiln_graph::{Task, TaskError, TaskOutcome};
use std::sync::Arc;
use tracing::{debug, error};

pub use cache::{CacheStats, CompiledModule, ScriptCache};
pub use plugin::TranspilePlugin;
pub use transpile::{Transpiled, transpile};

/// The `js` task.
#[derive(Debug, Clone)]
pub struct ScriptBuilder {
    cache: Arc<ScriptCache>,
}

impl ScriptBuilder {
    pub fn new(cache: Arc<ScriptCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<ScriptCache> {
        &self.cache
    }
}

#[async_trait]
impl Task for ScriptBuilder {
    async fn run(&self) -> Result<TaskOutcome, TaskError> {
        match self.cache.rebuild(&[]).await {
            Ok(artifact) => {
                artifact.write(&self.cache.paths().out_root()).await?;
                let stats = self.cache.stats();
                debug!(
                    "Script bundle {} ({} bytes), {} cached / {} compiled module(s)",
                    artifact.bundle.path.display(),
                    artifact.bundle.len(),
                    stats.hits,
                    stats.misses
                );
                Ok(TaskOutcome::Completed)
            }
            Err(err) if err.is_compile() => {
                let mut diagnostics = err.diagnostics();
                if diagnostics.is_empty() {
                    diagnostics.push(err.to_string());
                }
                for diagnostic in &diagnostics {
                    error!("{}", diagnostic);
                }
                Ok(TaskOutcome::CompletedWithErrors(diagnostics))
            }
            Err(err) => Err(err.into()),
        }
    }
}
