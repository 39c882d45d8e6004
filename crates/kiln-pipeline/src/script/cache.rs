//! Incremental script compilation state.
//!
//! The cache keeps every compiled project module keyed by absolute path,
//! together with a BLAKE3 hash of the source it was compiled from and the
//! modules it imports. Rebuilding re-runs the bundler, but the bundler's load
//! hook is answered from the cache for every module whose source hash is
//! unchanged, so only edited modules are recompiled.

use arcstr::ArcStr;
use parking_lot::Mutex;
use path_clean::PathClean;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::bundle;
use super::transpile::transpile;
use crate::artifact::Artifact;
use crate::error::{PipelineError, Result};
use crate::mode::BuildMode;
use crate::paths::PathConfig;

/// Extensions tried, in order, when resolving an extensionless relative import.
pub(crate) const MODULE_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "mjs"];

/// Hit and miss counts of the last rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
}

/// One compiled module.
#[derive(Debug, Clone)]
pub struct CompiledModule {
    pub hash: blake3::Hash,
    pub code: ArcStr,
    pub map: Option<String>,
    /// Project modules this module imports, resolved to absolute paths.
    pub imports: Vec<PathBuf>,
}

#[derive(Debug)]
struct CacheState {
    modules: FxHashMap<PathBuf, CompiledModule>,
    /// Modules loaded during the bundle in progress.
    loaded: FxHashSet<PathBuf>,
    dirty: bool,
    last: Option<Artifact>,
    stats: CacheStats,
    diagnostics: Vec<String>,
}

/// Compiled-module cache and owner of the script bundle.
#[derive(Debug)]
pub struct ScriptCache {
    paths: Arc<PathConfig>,
    mode: BuildMode,
    state: Mutex<CacheState>,
}

impl ScriptCache {
    pub fn new(paths: Arc<PathConfig>, mode: BuildMode) -> Self {
        Self {
            paths,
            mode,
            state: Mutex::new(CacheState {
                modules: FxHashMap::default(),
                loaded: FxHashSet::default(),
                dirty: true,
                last: None,
                stats: CacheStats::default(),
                diagnostics: Vec::new(),
            }),
        }
    }

    pub fn paths(&self) -> &PathConfig {
        &self.paths
    }

    pub fn mode(&self) -> BuildMode {
        self.mode
    }

    /// Drop the compiled form of `path`.
    ///
    /// Returns whether the module was part of the cached graph; only then is
    /// the graph marked dirty.
    pub fn invalidate(&self, path: &Path) -> bool {
        let path = path.clean();
        let mut state = self.state.lock();
        let removed = state.modules.remove(&path).is_some();
        if removed {
            debug!("Invalidated {}", path.display());
            state.dirty = true;
        }
        removed
    }

    /// Invalidate `changed` and re-bundle.
    ///
    /// When nothing in the cached graph changed and the previous bundle
    /// succeeded, that bundle is returned without running the bundler. On a
    /// compile error the previous bundle stays cached and the error carries
    /// every module diagnostic collected during the attempt.
    pub async fn rebuild(self: &Arc<Self>, changed: &[PathBuf]) -> Result<Artifact> {
        let touched = changed.iter().filter(|path| self.invalidate(path)).count();

        let reusable = {
            let mut state = self.state.lock();
            state.stats = CacheStats::default();
            state.diagnostics.clear();
            state.loaded.clear();
            if state.dirty { None } else { state.last.clone() }
        };
        if let Some(previous) = reusable {
            debug!("No cached module changed, reusing previous bundle");
            return Ok(previous);
        }
        if touched > 0 {
            debug!(
                "Rebuilding after {} changed module(s): {}",
                touched,
                self.affected(changed)
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        let result = bundle::bundle(self).await;

        let mut state = self.state.lock();
        match result {
            Ok(artifact) => {
                let state = &mut *state;
                let loaded = &state.loaded;
                state.modules.retain(|path, _| loaded.contains(path));
                state.dirty = false;
                state.last = Some(artifact.clone());
                Ok(artifact)
            }
            Err(err) => {
                state.dirty = true;
                let diagnostics = std::mem::take(&mut state.diagnostics);
                if err.is_compile() && !diagnostics.is_empty() {
                    Err(PipelineError::Compile { diagnostics })
                } else {
                    Err(err)
                }
            }
        }
    }

    /// Compiled code for `path`, compiling only when `source` differs from
    /// the cached compilation.
    pub fn load(&self, path: &Path, source: &str) -> Result<ArcStr> {
        let path = path.clean();
        let hash = blake3::hash(source.as_bytes());

        {
            let mut state = self.state.lock();
            state.loaded.insert(path.clone());
            let cached = state
                .modules
                .get(&path)
                .filter(|module| module.hash == hash)
                .map(|module| module.code.clone());
            if let Some(code) = cached {
                state.stats.hits += 1;
                return Ok(code);
            }
        }

        let compiled = transpile(&path, source);

        let mut state = self.state.lock();
        state.stats.misses += 1;
        match compiled {
            Ok(out) => {
                let imports = resolve_imports(&path, &out.imports);
                let code = ArcStr::from(out.code);
                state.modules.insert(
                    path,
                    CompiledModule {
                        hash,
                        code: code.clone(),
                        map: out.map,
                        imports,
                    },
                );
                Ok(code)
            }
            Err(err) => {
                state.modules.remove(&path);
                state.diagnostics.extend(err.diagnostics());
                Err(err)
            }
        }
    }

    /// Changed modules plus every module that transitively imports one of
    /// them, sorted by path. Paths outside the cached graph are ignored.
    pub fn affected(&self, changed: &[PathBuf]) -> Vec<PathBuf> {
        let state = self.state.lock();

        let mut importers: FxHashMap<&Path, Vec<&Path>> = FxHashMap::default();
        for (path, module) in &state.modules {
            for import in &module.imports {
                importers.entry(import.as_path()).or_default().push(path.as_path());
            }
        }

        let mut seen: FxHashSet<PathBuf> = FxHashSet::default();
        let mut queue: VecDeque<PathBuf> = changed
            .iter()
            .map(|p| p.clean())
            .filter(|p| state.modules.contains_key(p) || importers.contains_key(p.as_path()))
            .collect();

        while let Some(path) = queue.pop_front() {
            if !seen.insert(path.clone()) {
                continue;
            }
            if let Some(parents) = importers.get(path.as_path()) {
                queue.extend(parents.iter().map(|p| p.to_path_buf()));
            }
        }

        let mut affected: Vec<PathBuf> = seen.into_iter().collect();
        affected.sort();
        affected
    }

    /// Hit and miss counts of the last rebuild.
    pub fn stats(&self) -> CacheStats {
        self.state.lock().stats
    }

    /// Number of modules currently cached.
    pub fn len(&self) -> usize {
        self.state.lock().modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn module(&self, path: &Path) -> Option<CompiledModule> {
        self.state.lock().modules.get(&path.clean()).cloned()
    }

    /// The last successfully built bundle.
    pub fn last_artifact(&self) -> Option<Artifact> {
        self.state.lock().last.clone()
    }
}

/// Resolve relative import specifiers against `importer` to existing files.
fn resolve_imports(importer: &Path, specifiers: &[String]) -> Vec<PathBuf> {
    let Some(dir) = importer.parent() else {
        return Vec::new();
    };

    specifiers
        .iter()
        .filter(|s| s.starts_with("./") || s.starts_with("../"))
        .filter_map(|specifier| resolve_relative(&dir.join(specifier).clean()))
        .collect()
}

fn resolve_relative(base: &Path) -> Option<PathBuf> {
    if base.is_file() {
        return Some(base.to_path_buf());
    }
    let file_name = base.file_name()?.to_string_lossy().into_owned();
    MODULE_EXTENSIONS
        .iter()
        .map(|ext| base.with_file_name(format!("{file_name}.{ext}")))
        .chain(MODULE_EXTENSIONS.iter().map(|ext| base.join(format!("index.{ext}"))))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn project() -> (TempDir, Arc<ScriptCache>) {
        let temp = TempDir::new().unwrap();
        let app = temp.path().join("app");
        fs::create_dir_all(app.join("util")).unwrap();
        fs::write(app.join("main.ts"), "import { greet } from \"./greet\";\ngreet();\n").unwrap();
        fs::write(
            app.join("greet.ts"),
            "import { name } from \"./util\";\nexport function greet(): string { return name; }\n",
        )
        .unwrap();
        fs::write(app.join("util/index.ts"), "export const name: string = \"kiln\";\n").unwrap();
        let cache = Arc::new(ScriptCache::new(
            Arc::new(PathConfig::new(temp.path())),
            BuildMode::default(),
        ));
        (temp, cache)
    }

    fn load_all(cache: &ScriptCache, root: &Path) {
        for rel in ["app/main.ts", "app/greet.ts", "app/util/index.ts"] {
            let path = root.join(rel);
            let source = fs::read_to_string(&path).unwrap();
            cache.load(&path, &source).unwrap();
        }
    }

    #[test]
    fn test_unchanged_source_is_a_hit() {
        let (temp, cache) = project();
        load_all(&cache, temp.path());
        load_all(&cache, temp.path());
        assert_eq!(cache.stats(), CacheStats { hits: 3, misses: 3 });
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_changed_source_recompiles() {
        let (temp, cache) = project();
        let path = temp.path().join("app/greet.ts");
        cache.load(&path, "export const a: number = 1;").unwrap();
        let code = cache.load(&path, "export const a: number = 2;").unwrap();
        assert!(code.contains("2"));
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn test_affected_follows_importers() {
        let (temp, cache) = project();
        load_all(&cache, temp.path());
        let root = temp.path();

        let affected = cache.affected(&[root.join("app/util/index.ts")]);
        let mut expected = vec![
            root.join("app/greet.ts"),
            root.join("app/main.ts"),
            root.join("app/util/index.ts"),
        ];
        expected.sort();
        assert_eq!(affected, expected);

        assert_eq!(cache.affected(&[root.join("app/main.ts")]), vec![root.join("app/main.ts")]);
        assert!(cache.affected(&[root.join("styles/site.css")]).is_empty());
    }

    #[test]
    fn test_invalidate_reports_membership() {
        let (temp, cache) = project();
        load_all(&cache, temp.path());
        assert!(cache.invalidate(&temp.path().join("app/greet.ts")));
        assert!(!cache.invalidate(&temp.path().join("app/greet.ts")));
        assert!(!cache.invalidate(&temp.path().join("app/other.ts")));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_compile_error_is_recorded_and_not_cached() {
        let (temp, cache) = project();
        let path = temp.path().join("app/greet.ts");
        let err = cache.load(&path, "export const = ;").unwrap_err();
        assert!(err.is_compile());
        assert!(cache.module(&path).is_none());
    }
}
