//! Pass-through copies (templates, vendor libraries, server entry) and the
//! per-file server script transpile.

use async_trait::async_trait;
use kiln_graph::{Task, TaskError, TaskOutcome};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error};

use crate::artifact::{OutputFile, write_files_atomic};
use crate::error::{PipelineError, Result};
use crate::glob::SourceGlob;
use crate::paths::{CopySet, PathConfig};
use crate::script::transpile;

/// What a copy task did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyReport {
    pub files: usize,
    pub bytes: u64,
}

/// Copy every file matched by `set` into `out_root/set.dest`, preserving the
/// path beneath each pattern's static base.
pub async fn copy_set(root: &Path, out_root: &Path, set: &CopySet) -> Result<CopyReport> {
    let glob = SourceGlob::new(root, &set.sources)?;
    let dest_root = out_root.join(&set.dest);
    let mut report = CopyReport::default();

    for found in glob.files()? {
        let target = crate::artifact::validate_output_path(&dest_root, &found.relative)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PipelineError::io("Failed to create directory", parent, e))?;
        }
        let bytes = tokio::fs::copy(&found.path, &target)
            .await
            .map_err(|e| PipelineError::io("Failed to copy", &found.path, e))?;
        debug!("Copied {} -> {}", found.path.display(), target.display());
        report.files += 1;
        report.bytes += bytes;
    }

    Ok(report)
}

/// A `lib`, `templates` or `server` task.
#[derive(Debug, Clone)]
pub struct CopyTask {
    label: &'static str,
    paths: Arc<PathConfig>,
    set: CopySet,
}

impl CopyTask {
    pub fn new(label: &'static str, paths: Arc<PathConfig>, set: CopySet) -> Self {
        Self { label, paths, set }
    }
}

#[async_trait]
impl Task for CopyTask {
    async fn run(&self) -> std::result::Result<TaskOutcome, TaskError> {
        let report = copy_set(&self.paths.root, &self.paths.out_root(), &self.set).await?;
        debug!(
            "{}: {} file(s), {} bytes",
            self.label, report.files, report.bytes
        );
        Ok(TaskOutcome::Completed)
    }
}

/// Output path of a transpiled server module: `.ts`/`.tsx`/`.mts` become `.js`.
fn js_output_path(relative: &Path) -> PathBuf {
    match relative.extension().and_then(|e| e.to_str()) {
        Some("ts" | "tsx" | "mts") => relative.with_extension("js"),
        _ => relative.to_path_buf(),
    }
}

/// The `server-js` task: transpile every matched source file on its own.
///
/// Each module is compiled independently (no bundling); its source map is
/// written alongside. Compile errors are reported per file and leave that
/// file's previous output in place.
#[derive(Debug, Clone)]
pub struct TranspileTask {
    paths: Arc<PathConfig>,
    set: CopySet,
}

impl TranspileTask {
    pub fn new(paths: Arc<PathConfig>, set: CopySet) -> Self {
        Self { paths, set }
    }

    async fn transpile_all(&self) -> Result<(CopyReport, Vec<String>)> {
        let glob = SourceGlob::new(&self.paths.root, &self.set.sources)?;
        let out_root = self.paths.out_root();
        let mut report = CopyReport::default();
        let mut diagnostics = Vec::new();

        for found in glob.files()? {
            let source = tokio::fs::read_to_string(&found.path)
                .await
                .map_err(|e| PipelineError::io("Failed to read", &found.path, e))?;

            let compiled = match transpile(&found.path, &source) {
                Ok(compiled) => compiled,
                Err(err) if err.is_compile() => {
                    diagnostics.extend(err.diagnostics());
                    continue;
                }
                Err(err) => return Err(err),
            };

            let relative = self.set.dest.join(js_output_path(&found.relative));
            let mut map_relative = relative.clone().into_os_string();
            map_relative.push(".map");
            let map_relative = PathBuf::from(map_relative);

            let mut code = compiled.code;
            let mut files = Vec::with_capacity(2);
            if let Some(map) = compiled.map {
                if !code.ends_with('\n') {
                    code.push('\n');
                }
                if let Some(name) = map_relative.file_name() {
                    code.push_str(&format!("//# sourceMappingURL={}\n", name.to_string_lossy()));
                }
                files.push(OutputFile::new(map_relative, map.into_bytes()));
            }
            files.insert(0, OutputFile::new(relative, code.into_bytes()));

            report.files += 1;
            report.bytes += files.iter().map(|f| f.len() as u64).sum::<u64>();
            write_files_atomic(&out_root, &files.iter().collect::<Vec<_>>()).await?;
        }

        Ok((report, diagnostics))
    }
}

#[async_trait]
impl Task for TranspileTask {
    async fn run(&self) -> std::result::Result<TaskOutcome, TaskError> {
        let (report, diagnostics) = self.transpile_all().await?;
        debug!("server-js: {} file(s), {} bytes", report.files, report.bytes);
        for diagnostic in &diagnostics {
            error!("{}", diagnostic);
        }
        Ok(TaskOutcome::from_errors(diagnostics))
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[tokio::test]
    async fn test_copy_preserves_structure_and_bytes() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "app/main.html", "<p>main</p>");
        write(root, "app/views/list.html", "<ul></ul>");

        let set = CopySet::new(["app/**/*.html"], "app");
        let report = copy_set(root, &root.join("dist"), &set).await.unwrap();

        assert_eq!(report.files, 2);
        assert_eq!(report.bytes, 20);
        assert_eq!(
            fs::read_to_string(root.join("dist/app/views/list.html")).unwrap(),
            "<ul></ul>"
        );
    }

    #[tokio::test]
    async fn test_literal_sources_flatten_to_file_name() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "node_modules/es6-shim/es6-shim.min.js", "shim");

        let set = CopySet::new(
            [
                "node_modules/es6-shim/es6-shim.min.js",
                "node_modules/reflect-metadata/Reflect.js",
            ],
            "lib",
        );
        let report = copy_set(root, &root.join("dist"), &set).await.unwrap();

        assert_eq!(report.files, 1);
        assert!(root.join("dist/lib/es6-shim.min.js").is_file());
    }

    #[tokio::test]
    async fn test_server_js_transpiles_each_file() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "app/api/handler.ts", "export const port: number = 3011;\n");
        write(root, "app/broken.ts", "export const = ;\n");

        let task = TranspileTask::new(
            Arc::new(PathConfig::new(root)),
            CopySet::new(["app/**/*.ts"], "app"),
        );
        let outcome = task.run().await.unwrap();

        let js = fs::read_to_string(root.join("dist/app/api/handler.js")).unwrap();
        assert!(js.contains("export const port = 3011"));
        assert!(js.ends_with("//# sourceMappingURL=handler.js.map\n"));
        assert!(root.join("dist/app/api/handler.js.map").is_file());
        assert!(!root.join("dist/app/broken.js").exists());
        assert!(!outcome.is_clean());
    }

    #[test]
    fn test_js_output_path() {
        assert_eq!(js_output_path(Path::new("a/b.ts")), PathBuf::from("a/b.js"));
        assert_eq!(js_output_path(Path::new("a/b.js")), PathBuf::from("a/b.js"));
    }
}
