//! Rolldown invocation producing the single browser bundle.

use rolldown::{
    BundlerBuilder as RolldownBundlerBuilder, BundlerOptions, InputItem, OutputFormat, Platform,
    RawMinifyOptions, ResolveOptions, SourceMapType,
};
use rolldown_common::Output;
use rolldown_plugin::__inner::SharedPluginable;
use std::path::PathBuf;
use std::sync::Arc;

use super::cache::ScriptCache;
use super::plugin::TranspilePlugin;
use crate::artifact::{Artifact, OutputFile};
use crate::error::{PipelineError, Result};

fn bundler_options(cache: &ScriptCache, name: &str) -> BundlerOptions {
    let paths = cache.paths();
    let release = cache.mode().release;

    BundlerOptions {
        input: Some(vec![InputItem {
            name: Some(name.to_string()),
            import: paths.script_entry_path().to_string_lossy().into_owned(),
        }]),
        cwd: Some(paths.root.clone()),
        format: Some(OutputFormat::Iife),
        platform: Some(Platform::Browser),
        sourcemap: Some(SourceMapType::File),
        minify: release.then(|| RawMinifyOptions::from(true)),
        resolve: Some(ResolveOptions {
            extensions: Some(
                [".ts", ".tsx", ".js", ".mjs", ".json"]
                    .iter()
                    .map(|ext| ext.to_string())
                    .collect(),
            ),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Bundle the script entry. Nothing is written to disk.
pub(crate) async fn bundle(cache: &Arc<ScriptCache>) -> Result<Artifact> {
    let paths = cache.paths();
    let entry = paths.script_entry_path();
    if !entry.is_file() {
        return Err(PipelineError::MissingInput(entry));
    }

    let bundle_path = paths.script_bundle.clone();
    let name = bundle_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "bundle".to_string());
    let map_path = {
        let mut file_name = bundle_path.file_name().unwrap_or_default().to_os_string();
        file_name.push(".map");
        bundle_path.with_file_name(file_name)
    };
    let map_name = map_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let plugins: Vec<SharedPluginable> = vec![Arc::new(TranspilePlugin::new(Arc::clone(cache)))];
    let mut bundler = RolldownBundlerBuilder::default()
        .with_options(bundler_options(cache, &name))
        .with_plugins(plugins)
        .build()
        .map_err(|e| PipelineError::Bundler(format!("{:?}", e)))?;

    let output = bundler.generate().await.map_err(|e| PipelineError::Compile {
        diagnostics: vec![format!("{:?}", e)],
    })?;

    let mut code: Option<String> = None;
    let mut map: Option<Vec<u8>> = None;
    for item in &output.assets {
        match item {
            Output::Chunk(chunk) if chunk.is_entry => {
                code = Some(chunk.code.clone());
                if map.is_none() {
                    map = chunk.map.as_ref().map(|m| m.to_json_string().into_bytes());
                }
            }
            Output::Asset(asset) if asset.filename.as_str().ends_with(".map") => {
                map = Some(asset.source.as_bytes().to_vec());
            }
            _ => {}
        }
    }

    let mut code =
        code.ok_or_else(|| PipelineError::Bundler("bundler produced no entry chunk".to_string()))?;
    if map.is_some() && !code.contains("sourceMappingURL=") {
        if !code.ends_with('\n') {
            code.push('\n');
        }
        code.push_str(&format!("//# sourceMappingURL={}\n", map_name));
    }

    Ok(Artifact {
        bundle: OutputFile::new(bundle_path, code.into_bytes()),
        source_map: map.map(|bytes| OutputFile::new(PathBuf::from(&map_path), bytes)),
    })
}
