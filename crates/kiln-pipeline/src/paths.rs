//! Source locator: where every input lives and where every output goes.

use path_clean::PathClean;
use std::path::{Path, PathBuf};

/// A set of glob patterns copied (or transpiled) into one output subdirectory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopySet {
    /// Glob patterns or literal paths, relative to the project root.
    pub sources: Vec<String>,
    /// Destination directory, relative to the output directory.
    pub dest: PathBuf,
}

impl CopySet {
    pub fn new<I, S>(sources: I, dest: impl Into<PathBuf>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sources: sources.into_iter().map(Into::into).collect(),
            dest: dest.into(),
        }
    }
}

/// Immutable mapping from logical asset names to project paths.
///
/// Relative paths are resolved against `root` (inputs) or `out_dir`
/// (outputs). Built once at startup and shared read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathConfig {
    pub root: PathBuf,
    pub out_dir: PathBuf,

    pub script_entry: PathBuf,
    pub script_sources: Vec<String>,
    /// Bundle file, relative to `out_dir`.
    pub script_bundle: PathBuf,

    pub style_entry: PathBuf,
    pub style_sources: Vec<String>,
    /// Stylesheet bundle, relative to `out_dir`.
    pub style_bundle: PathBuf,
    /// Browser targets such as `"chrome 80"` used to lower modern CSS.
    pub style_targets: Vec<String>,

    pub html_template: PathBuf,
    /// Composed page, relative to `out_dir`.
    pub html_output: PathBuf,

    pub templates: CopySet,
    pub lib: CopySet,
    pub server: CopySet,
    pub server_js: CopySet,

    pub max_line_length: usize,
}

impl PathConfig {
    /// Default project layout rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            out_dir: PathBuf::from("dist"),
            script_entry: PathBuf::from("app/main.ts"),
            script_sources: vec!["app/**/*.ts".to_string()],
            script_bundle: PathBuf::from("app/bundle.js"),
            style_entry: PathBuf::from("styles/site.css"),
            style_sources: vec!["styles/**/*.css".to_string()],
            style_bundle: PathBuf::from("css/site.css"),
            style_targets: vec![
                "chrome 80".to_string(),
                "firefox 78".to_string(),
                "safari 13".to_string(),
            ],
            html_template: PathBuf::from("index.html"),
            html_output: PathBuf::from("index.html"),
            templates: CopySet::new(["app/**/*.html"], "app"),
            lib: CopySet::new(
                [
                    "node_modules/es6-shim/es6-shim.min.js",
                    "node_modules/es6-shim/es6-shim.map",
                    "node_modules/reflect-metadata/Reflect.js",
                    "node_modules/reflect-metadata/Reflect.js.map",
                ],
                "lib",
            ),
            server: CopySet::new(["server.js"], "."),
            server_js: CopySet::new(["app/**/*.ts"], "app"),
            max_line_length: 140,
        }
    }

    /// Resolve an input path against the project root.
    pub fn input(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative).clean()
    }

    /// Absolute output directory.
    pub fn out_root(&self) -> PathBuf {
        self.input(&self.out_dir)
    }

    /// Resolve an output path against the output directory.
    pub fn output(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.out_root().join(relative).clean()
    }

    pub fn script_entry_path(&self) -> PathBuf {
        self.input(&self.script_entry)
    }

    pub fn script_bundle_path(&self) -> PathBuf {
        self.output(&self.script_bundle)
    }

    pub fn style_entry_path(&self) -> PathBuf {
        self.input(&self.style_entry)
    }

    pub fn style_bundle_path(&self) -> PathBuf {
        self.output(&self.style_bundle)
    }

    pub fn html_template_path(&self) -> PathBuf {
        self.input(&self.html_template)
    }

    pub fn html_output_path(&self) -> PathBuf {
        self.output(&self.html_output)
    }

    /// URL path under which an output file is served, e.g. `/app/bundle.js`.
    pub fn url_for(&self, output_relative: impl AsRef<Path>) -> String {
        let cleaned = output_relative.as_ref().clean();
        let parts: Vec<String> = cleaned
            .components()
            .filter_map(|c| match c {
                std::path::Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        format!("/{}", parts.join("/"))
    }
}

impl Default for PathConfig {
    fn default() -> Self {
        Self::new(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let paths = PathConfig::new("/project");
        assert_eq!(
            paths.script_bundle_path(),
            PathBuf::from("/project/dist/app/bundle.js")
        );
        assert_eq!(
            paths.style_bundle_path(),
            PathBuf::from("/project/dist/css/site.css")
        );
        assert_eq!(
            paths.html_output_path(),
            PathBuf::from("/project/dist/index.html")
        );
        assert_eq!(paths.lib.dest, PathBuf::from("lib"));
    }

    #[test]
    fn test_url_for_uses_forward_slashes() {
        let paths = PathConfig::new("/project");
        assert_eq!(paths.url_for("app/bundle.js"), "/app/bundle.js");
        assert_eq!(paths.url_for("./css/site.css"), "/css/site.css");
    }

    #[test]
    fn test_absolute_out_dir_wins() {
        let mut paths = PathConfig::new("/project");
        paths.out_dir = PathBuf::from("/elsewhere/out");
        assert_eq!(paths.output("index.html"), PathBuf::from("/elsewhere/out/index.html"));
    }
}
