use kiln_pipeline::PathConfig;
use kiln_pipeline::style::parse_targets;
use std::path::{Component, Path};

use crate::config::KilnConfig;
use crate::error::ConfigError;

const MAX_DEBOUNCE_MS: u64 = 10_000;

fn invalid(field: &str, value: impl ToString, hint: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        hint: hint.to_string(),
    }
}

/// A path that is set and is not the project root itself.
fn is_nested(path: &Path) -> bool {
    path.components()
        .any(|c| matches!(c, Component::Normal(_)) || matches!(c, Component::RootDir))
}

impl KilnConfig {
    /// Check values serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_nested(&self.out_dir) {
            return Err(invalid(
                "out_dir",
                self.out_dir.display(),
                "Use a dedicated directory such as \"dist\"; builds write into it",
            ));
        }

        for (field, path) in [
            ("script.entry", &self.script.entry),
            ("style.entry", &self.style.entry),
            ("html.template", &self.html.template),
        ] {
            if path.as_os_str().is_empty() {
                return Err(invalid(field, "\"\"", "Point it at a file in the project"));
            }
        }

        if self.script.sources.is_empty() {
            return Err(invalid(
                "script.sources",
                "[]",
                "List the globs of the script sources, e.g. [\"app/**/*.ts\"]",
            ));
        }

        parse_targets(&self.style.targets).map_err(|e| {
            invalid(
                "style.targets",
                e,
                "Use \"<browser> <version>\", e.g. \"chrome 80\" or \"safari 13.1\"",
            )
        })?;

        if self.watch.debounce_ms > MAX_DEBOUNCE_MS {
            return Err(invalid(
                "watch.debounce_ms",
                self.watch.debounce_ms,
                "Use at most 10000 milliseconds",
            ));
        }

        if self.dev.port == 0 {
            return Err(invalid("dev.port", 0, "Use a port between 1 and 65535"));
        }
        if self.dev.backend_port == 0 {
            return Err(invalid(
                "dev.backend_port",
                0,
                "Use a port between 1 and 65535",
            ));
        }
        if self.dev.port == self.dev.backend_port {
            return Err(ConfigError::ConflictingOptions(format!(
                "dev.port and dev.backend_port are both {}",
                self.dev.port
            )));
        }
        if self.dev.backend_command.trim().is_empty() {
            return Err(invalid(
                "dev.backend_command",
                "\"\"",
                "Name the program that starts the backend, e.g. \"node\"",
            ));
        }

        Ok(())
    }

    /// Build the pipeline's path mapping for a project rooted at `root`.
    pub fn path_config(&self, root: &Path) -> PathConfig {
        PathConfig {
            root: root.to_path_buf(),
            out_dir: self.out_dir.clone(),
            script_entry: self.script.entry.clone(),
            script_sources: self.script.sources.clone(),
            script_bundle: self.script.bundle.clone(),
            style_entry: self.style.entry.clone(),
            style_sources: self.style.sources.clone(),
            style_bundle: self.style.bundle.clone(),
            style_targets: self.style.targets.clone(),
            html_template: self.html.template.clone(),
            html_output: self.html.output.clone(),
            templates: (&self.templates).into(),
            lib: (&self.lib).into(),
            server: (&self.server).into(),
            server_js: (&self.server_js).into(),
            max_line_length: self.lint.max_line_length,
        }
    }
}
