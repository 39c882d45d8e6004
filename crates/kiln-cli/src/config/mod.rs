//! Configuration for kiln with multi-source loading.
//!
//! Settings come from built-in defaults, `kiln.toml`, `KILN_*` environment
//! variables and CLI flags, later sources winning. Nested keys in the
//! environment are separated by `__`, e.g. `KILN_DEV__PORT=9000`.
//!
//! ```toml
//! out_dir = "dist"
//!
//! [script]
//! entry = "app/main.ts"
//! sources = ["app/**/*.ts"]
//!
//! [dev]
//! port = 8003
//! backend_port = 3011
//! ```

mod loading;
mod tests;
mod validation;

use kiln_pipeline::{CopySet, PathConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use loading::{CONFIG_FILE, Project};

/// Contents of `kiln.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KilnConfig {
    /// Output directory, relative to the project root
    pub out_dir: PathBuf,
    pub script: ScriptSection,
    pub style: StyleSection,
    pub html: HtmlSection,
    pub templates: CopySection,
    pub lib: CopySection,
    pub server: CopySection,
    /// Server modules transpiled one by one
    pub server_js: CopySection,
    pub lint: LintSection,
    pub watch: WatchSection,
    pub dev: DevSection,
}

/// `[script]`: the browser bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScriptSection {
    pub entry: PathBuf,
    /// Globs watched and linted
    pub sources: Vec<String>,
    /// Bundle path inside the output directory
    pub bundle: PathBuf,
}

/// `[style]`: the stylesheet bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StyleSection {
    pub entry: PathBuf,
    pub sources: Vec<String>,
    pub bundle: PathBuf,
    /// Browser targets such as `"safari 13"`
    pub targets: Vec<String>,
}

/// `[html]`: the page template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HtmlSection {
    pub template: PathBuf,
    pub output: PathBuf,
}

/// `[templates]`, `[lib]`, `[server]` and `[server_js]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CopySection {
    pub sources: Vec<String>,
    /// Destination inside the output directory
    pub dest: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LintSection {
    /// `0` disables the check
    pub max_line_length: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchSection {
    /// Settle window grouping the events of one save
    pub debounce_ms: u64,
    /// Extra paths ignored by the watcher (prefixes or `*.ext`)
    pub ignore: Vec<String>,
}

/// `[dev]`: live-reload server and backend process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DevSection {
    pub port: u16,
    pub backend_port: u16,
    pub backend_command: String,
    /// Arguments of the backend command, which runs inside the output directory
    pub backend_args: Vec<String>,
}

impl Default for KilnConfig {
    fn default() -> Self {
        let paths = PathConfig::default();
        Self {
            out_dir: paths.out_dir,
            script: ScriptSection {
                entry: paths.script_entry,
                sources: paths.script_sources,
                bundle: paths.script_bundle,
            },
            style: StyleSection {
                entry: paths.style_entry,
                sources: paths.style_sources,
                bundle: paths.style_bundle,
                targets: paths.style_targets,
            },
            html: HtmlSection {
                template: paths.html_template,
                output: paths.html_output,
            },
            templates: paths.templates.into(),
            lib: paths.lib.into(),
            server: paths.server.into(),
            server_js: paths.server_js.into(),
            lint: LintSection {
                max_line_length: paths.max_line_length,
            },
            watch: WatchSection::default(),
            dev: DevSection::default(),
        }
    }
}

impl Default for ScriptSection {
    fn default() -> Self {
        KilnConfig::default().script
    }
}

impl Default for StyleSection {
    fn default() -> Self {
        KilnConfig::default().style
    }
}

impl Default for HtmlSection {
    fn default() -> Self {
        KilnConfig::default().html
    }
}

impl Default for CopySection {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            dest: PathBuf::from("."),
        }
    }
}

impl Default for LintSection {
    fn default() -> Self {
        KilnConfig::default().lint
    }
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            ignore: vec!["node_modules".to_string()],
        }
    }
}

impl Default for DevSection {
    fn default() -> Self {
        Self {
            port: 8003,
            backend_port: 3011,
            backend_command: "node".to_string(),
            backend_args: vec!["server.js".to_string()],
        }
    }
}

impl From<CopySet> for CopySection {
    fn from(set: CopySet) -> Self {
        Self {
            sources: set.sources,
            dest: set.dest,
        }
    }
}

impl From<&CopySection> for CopySet {
    fn from(section: &CopySection) -> Self {
        CopySet::new(section.sources.iter().cloned(), section.dest.clone())
    }
}
