//! Gitignore-style source globs relative to the project root.
//!
//! Patterns without glob metacharacters are literal file paths. Glob
//! patterns are matched with `ignore` overrides and expanded by walking from
//! their static base, the directory prefix before the first component that
//! contains a metacharacter.

use ignore::WalkBuilder;
use ignore::overrides::{Override, OverrideBuilder};
use path_clean::PathClean;
use rustc_hash::FxHashSet;
use std::path::{Component, Path, PathBuf};

use crate::error::{PipelineError, Result};

const GLOB_CHARS: &[char] = &['*', '?', '[', '{'];

/// Whether `pattern` contains glob metacharacters.
pub fn is_glob(pattern: &str) -> bool {
    pattern.contains(GLOB_CHARS)
}

/// Directory prefix of `pattern` before its first glob component.
///
/// ```
/// use kiln_pipeline::glob::static_base;
/// use std::path::PathBuf;
///
/// assert_eq!(static_base("app/**/*.html"), PathBuf::from("app"));
/// assert_eq!(static_base("*.ts"), PathBuf::from(""));
/// ```
pub fn static_base(pattern: &str) -> PathBuf {
    let pattern = pattern.trim_start_matches('!').trim_start_matches("./");
    let mut base = PathBuf::new();
    for component in Path::new(pattern).components() {
        match component {
            Component::Normal(part) if !part.to_string_lossy().contains(GLOB_CHARS) => {
                base.push(part)
            }
            Component::CurDir => {}
            _ => break,
        }
    }
    // A literal pattern is a file; its base is the containing directory.
    if !is_glob(pattern) {
        base.pop();
    }
    base
}

/// A file found by expanding a [`SourceGlob`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobMatch {
    /// Absolute path of the file.
    pub path: PathBuf,
    /// Path beneath the pattern's static base; just the file name for literals.
    pub relative: PathBuf,
}

/// Compiled set of source patterns.
#[derive(Debug, Clone)]
pub struct SourceGlob {
    root: PathBuf,
    patterns: Vec<String>,
    literals: Vec<PathBuf>,
    matcher: Option<Override>,
}

impl SourceGlob {
    pub fn new<S: AsRef<str>>(root: impl Into<PathBuf>, patterns: &[S]) -> Result<Self> {
        let root = root.into();
        let mut builder = OverrideBuilder::new(&root);
        let mut literals = Vec::new();
        let mut has_globs = false;

        for pattern in patterns {
            let pattern = pattern.as_ref();
            if is_glob(pattern) || pattern.starts_with('!') {
                builder.add(pattern).map_err(|e| PipelineError::Glob {
                    pattern: pattern.to_string(),
                    message: e.to_string(),
                })?;
                has_globs = true;
            } else {
                literals.push(Path::new(pattern.trim_start_matches("./")).clean());
            }
        }

        let matcher = if has_globs {
            Some(builder.build().map_err(|e| PipelineError::Glob {
                pattern: patterns
                    .iter()
                    .map(|p| p.as_ref())
                    .collect::<Vec<_>>()
                    .join(", "),
                message: e.to_string(),
            })?)
        } else {
            None
        };

        Ok(Self {
            root,
            patterns: patterns.iter().map(|p| p.as_ref().to_string()).collect(),
            literals,
            matcher,
        })
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Whether a file (absolute, or relative to the root) is selected.
    pub fn matches(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.root).unwrap_or(path).clean();
        if self.literals.iter().any(|literal| literal == &relative) {
            return true;
        }
        self.matcher
            .as_ref()
            .is_some_and(|m| m.matched(&relative, false).is_whitelist())
    }

    /// Expand the patterns into existing files, sorted by path.
    ///
    /// Missing literal files are skipped with a warning.
    pub fn files(&self) -> Result<Vec<GlobMatch>> {
        let mut seen = FxHashSet::default();
        let mut found = Vec::new();

        for literal in &self.literals {
            let path = self.root.join(literal);
            if !path.is_file() {
                tracing::warn!("No such file: {}", path.display());
                continue;
            }
            if seen.insert(path.clone()) {
                let relative = PathBuf::from(literal.file_name().unwrap_or(literal.as_os_str()));
                found.push(GlobMatch { path, relative });
            }
        }

        let mut globbed = Vec::new();
        for pattern in self.patterns.iter().filter(|p| is_glob(p) && !p.starts_with('!')) {
            let base = self.root.join(static_base(pattern));
            if !base.is_dir() {
                continue;
            }

            let mut walker = WalkBuilder::new(&base);
            walker.standard_filters(false);
            for entry in walker.build() {
                let entry = entry.map_err(|e| PipelineError::Glob {
                    pattern: pattern.clone(),
                    message: e.to_string(),
                })?;
                if !entry.file_type().is_some_and(|t| t.is_file()) {
                    continue;
                }
                let path = entry.path().to_path_buf();
                if !self.matches(&path) || !seen.insert(path.clone()) {
                    continue;
                }
                let relative = path.strip_prefix(&base).unwrap_or(&path).to_path_buf();
                globbed.push(GlobMatch { path, relative });
            }
        }
        globbed.sort_by(|a, b| a.path.cmp(&b.path));
        found.extend(globbed);

        Ok(found)
    }
}
