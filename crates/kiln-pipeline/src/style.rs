//! Style builder: stylesheet entry point to one CSS bundle.
//!
//! `@import`s are inlined by lightningcss's bundler, nesting and other modern
//! syntax is lowered for the configured browser targets, and a source map is
//! written next to the bundle.

use async_trait::async_trait;
use kiln_graph::{Task, TaskError, TaskOutcome};
use lightningcss::bundler::{Bundler, FileProvider};
use lightningcss::printer::PrinterOptions;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions};
use lightningcss::targets::{Browsers, Targets};
use parcel_sourcemap::SourceMap;
use std::sync::Arc;
use tracing::{debug, error};

use crate::artifact::{Artifact, OutputFile};
use crate::error::{PipelineError, Result};
use crate::mode::BuildMode;
use crate::paths::PathConfig;
use crate::reload::{ReloadSignal, ReloadSink};

/// Parse targets such as `"chrome 80"` or `"safari 13.1"`.
///
/// When a browser is listed more than once the oldest version wins.
pub fn parse_targets<S: AsRef<str>>(targets: &[S]) -> Result<Targets> {
    let mut browsers = Browsers::default();

    for target in targets {
        let target = target.as_ref();
        let invalid = || PipelineError::InvalidTarget(target.to_string());

        let mut parts = target.split_whitespace();
        let (Some(name), Some(version), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(invalid());
        };
        let version = parse_version(version).ok_or_else(invalid)?;

        let slot = match name.to_ascii_lowercase().as_str() {
            "android" => &mut browsers.android,
            "chrome" => &mut browsers.chrome,
            "edge" => &mut browsers.edge,
            "firefox" => &mut browsers.firefox,
            "ie" => &mut browsers.ie,
            "ios" | "ios_saf" => &mut browsers.ios_saf,
            "opera" => &mut browsers.opera,
            "safari" => &mut browsers.safari,
            "samsung" => &mut browsers.samsung,
            _ => return Err(invalid()),
        };
        *slot = Some(slot.map_or(version, |current| current.min(version)));
    }

    Ok(Targets::from(browsers))
}

/// `major[.minor[.patch]]` in lightningcss's packed `major << 16 | minor << 8 | patch` form.
fn parse_version(version: &str) -> Option<u32> {
    let mut packed = 0u32;
    let mut count = 0;
    for (i, part) in version.split('.').enumerate() {
        if i > 2 {
            return None;
        }
        let value: u32 = part.parse().ok()?;
        if value > 255 && i > 0 {
            return None;
        }
        packed |= value << (16 - 8 * i as u32);
        count += 1;
    }
    (count > 0).then_some(packed)
}

/// Bundle and compile the stylesheet entry. Nothing is written to disk.
pub fn compile_stylesheet(paths: &PathConfig, release: bool) -> Result<Artifact> {
    let entry = paths.style_entry_path();
    if !entry.is_file() {
        return Err(PipelineError::MissingInput(entry));
    }
    let targets = parse_targets(&paths.style_targets)?;

    let fs = FileProvider::new();
    let mut source_map = SourceMap::new(&paths.root.to_string_lossy());

    let mut stylesheet = {
        let mut bundler = Bundler::new(
            &fs,
            Some(&mut source_map),
            ParserOptions {
                filename: entry.to_string_lossy().into_owned(),
                ..ParserOptions::default()
            },
        );
        bundler
            .bundle(&entry)
            .map_err(|e| PipelineError::compile(format!("{}: {}", entry.display(), e)))?
    };

    stylesheet
        .minify(MinifyOptions {
            targets: targets.clone(),
            ..MinifyOptions::default()
        })
        .map_err(|e| PipelineError::compile(format!("{}: {}", entry.display(), e)))?;

    let printed = stylesheet
        .to_css(PrinterOptions {
            minify: release,
            source_map: Some(&mut source_map),
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| PipelineError::compile(format!("{}: {}", entry.display(), e)))?;

    let map_json = source_map
        .to_json(None)
        .map_err(|e| PipelineError::compile(format!("{}: source map: {:?}", entry.display(), e)))?;

    let bundle_path = paths.style_bundle.clone();
    let mut map_name = bundle_path.file_name().unwrap_or_default().to_os_string();
    map_name.push(".map");
    let map_path = bundle_path.with_file_name(&map_name);

    let mut code = printed.code;
    if !code.ends_with('\n') {
        code.push('\n');
    }
    code.push_str(&format!(
        "/*# sourceMappingURL={} */\n",
        map_name.to_string_lossy()
    ));

    Ok(Artifact {
        bundle: OutputFile::new(bundle_path, code.into_bytes()),
        source_map: Some(OutputFile::new(map_path, map_json.into_bytes())),
    })
}

/// The `css` task.
pub struct StyleBuilder {
    paths: Arc<PathConfig>,
    mode: BuildMode,
    reload: Arc<dyn ReloadSink>,
}

impl StyleBuilder {
    pub fn new(paths: Arc<PathConfig>, mode: BuildMode, reload: Arc<dyn ReloadSink>) -> Self {
        Self {
            paths,
            mode,
            reload,
        }
    }
}

#[async_trait]
impl Task for StyleBuilder {
    async fn run(&self) -> std::result::Result<TaskOutcome, TaskError> {
        let paths = self.paths.clone();
        let release = self.mode.release;
        let compiled = tokio::task::spawn_blocking(move || compile_stylesheet(&paths, release))
            .await
            .map_err(PipelineError::from)?;

        match compiled {
            Ok(artifact) => {
                artifact.write(&self.paths.out_root()).await?;
                debug!(
                    "Stylesheet {} ({} bytes)",
                    artifact.bundle.path.display(),
                    artifact.bundle.len()
                );
                self.reload.send(ReloadSignal::InjectCss {
                    path: self.paths.url_for(&self.paths.style_bundle),
                });
                Ok(TaskOutcome::Completed)
            }
            Err(err) if err.is_compile() => {
                let diagnostics = err.diagnostics();
                for diagnostic in &diagnostics {
                    error!("{}", diagnostic);
                }
                Ok(TaskOutcome::CompletedWithErrors(diagnostics))
            }
            Err(err) => Err(err.into()),
        }
    }
}
