use anyhow::Context;
use rolldown_common::ModuleType;
use rolldown_plugin::{HookLoadArgs, HookLoadOutput, HookLoadReturn, HookUsage, Plugin, PluginContext};
use std::borrow::Cow;
use std::path::{Component, Path};
use std::sync::Arc;

use super::cache::{MODULE_EXTENSIONS, ScriptCache};

/// Rolldown plugin answering `load` for project modules from the
/// [`ScriptCache`].
///
/// Modules under `node_modules` and virtual ids are left to rolldown.
#[derive(Debug)]
pub struct TranspilePlugin {
    cache: Arc<ScriptCache>,
}

impl TranspilePlugin {
    pub fn new(cache: Arc<ScriptCache>) -> Self {
        Self { cache }
    }
}

/// Whether rolldown should hand `id` to the transpiler.
pub(crate) fn is_project_module(id: &str) -> bool {
    if id.starts_with('\0') {
        return false;
    }
    let path = Path::new(id);
    let known_extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| MODULE_EXTENSIONS.contains(&ext));
    let vendored = path
        .components()
        .any(|c| matches!(c, Component::Normal(part) if part == "node_modules"));
    known_extension && !vendored && !id.ends_with(".d.ts")
}

impl Plugin for TranspilePlugin {
    fn name(&self) -> Cow<'static, str> {
        "kiln-transpile".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::Load
    }

    fn load(
        &self,
        _ctx: &PluginContext,
        args: &HookLoadArgs<'_>,
    ) -> impl std::future::Future<Output = HookLoadReturn> + Send {
        let id = args.id.to_string();
        let cache = Arc::clone(&self.cache);

        async move {
            if !is_project_module(&id) {
                return Ok(None);
            }

            let source = tokio::fs::read_to_string(&id)
                .await
                .with_context(|| format!("Failed to read module: {}", id))?;
            let code = cache.load(Path::new(&id), &source)?;

            Ok(Some(HookLoadOutput {
                code: code.as_str().into(),
                module_type: Some(ModuleType::Js),
                ..Default::default()
            }))
        }
    }
}
