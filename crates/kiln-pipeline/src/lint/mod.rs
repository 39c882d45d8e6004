//! Style checks over script sources.
//!
//! Findings are printed in the verbose format
//! `ERROR: (rule) path[line, col]: message`. The lint task never fails the
//! pipeline; unreadable or unparsable files are reported as findings.

mod rules;

use async_trait::async_trait;
use kiln_graph::{Task, TaskError, TaskOutcome};
use oxc_allocator::Allocator;
use oxc_ast_visit::Visit;
use oxc_parser::Parser;
use oxc_span::SourceType;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::glob::SourceGlob;
use crate::paths::PathConfig;
use rules::{AstRules, line_col, line_rules};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LintOptions {
    /// Longest allowed line in characters; `0` disables the check.
    pub max_line_length: usize,
}

impl Default for LintOptions {
    fn default() -> Self {
        Self {
            max_line_length: 140,
        }
    }
}

/// One reported problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintFinding {
    pub rule: &'static str,
    pub path: PathBuf,
    /// One-based.
    pub line: usize,
    /// One-based, in characters.
    pub column: usize,
    pub message: String,
}

impl fmt::Display for LintFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ERROR: ({}) {}[{}, {}]: {}",
            self.rule,
            self.path.display(),
            self.line,
            self.column,
            self.message
        )
    }
}

/// Lint one source file. `path` is used for the source type and in findings.
pub fn lint_source(path: &Path, source: &str, options: LintOptions) -> Vec<LintFinding> {
    let finding = |rule: &'static str, offset: usize, message: String| {
        let (line, column) = line_col(source, offset);
        LintFinding {
            rule,
            path: path.to_path_buf(),
            line,
            column,
            message,
        }
    };

    let source_type = SourceType::from_path(path).unwrap_or_else(|_| SourceType::ts());
    let allocator = Allocator::default();
    let parsed = Parser::new(&allocator, source, source_type).parse();

    let mut findings: Vec<LintFinding> = parsed
        .errors
        .iter()
        .map(|e| finding("syntax-error", 0, e.to_string()))
        .collect();

    if parsed.errors.is_empty() {
        let mut ast_rules = AstRules::new(source);
        ast_rules.visit_program(&parsed.program);
        findings.extend(
            ast_rules
                .violations
                .into_iter()
                .map(|v| finding(v.rule, v.offset, v.message)),
        );
    }

    findings.extend(
        line_rules(source, options.max_line_length)
            .into_iter()
            .map(|v| finding(v.rule, v.offset, v.message)),
    );

    findings.sort_by(|a, b| (a.line, a.column, a.rule).cmp(&(b.line, b.column, b.rule)));
    findings
}

/// The `lint` task.
#[derive(Debug, Clone)]
pub struct LintTask {
    paths: Arc<PathConfig>,
    options: LintOptions,
}

impl LintTask {
    pub fn new(paths: Arc<PathConfig>, options: LintOptions) -> Self {
        Self { paths, options }
    }

    /// Lint every script source; I/O and glob failures become messages.
    pub async fn lint_all(&self) -> Vec<String> {
        let root = &self.paths.root;
        let files = match SourceGlob::new(root, &self.paths.script_sources).and_then(|g| g.files()) {
            Ok(files) => files,
            Err(err) => return vec![err.to_string()],
        };

        let mut messages = Vec::new();
        for file in files {
            let display = file.path.strip_prefix(root).unwrap_or(&file.path);
            match tokio::fs::read_to_string(&file.path).await {
                Ok(source) => {
                    for finding in lint_source(display, &source, self.options) {
                        messages.push(finding.to_string());
                    }
                }
                Err(e) => messages.push(format!("Failed to read '{}': {}", display.display(), e)),
            }
        }
        messages
    }
}

#[async_trait]
impl Task for LintTask {
    async fn run(&self) -> Result<TaskOutcome, TaskError> {
        let messages = self.lint_all().await;
        for message in &messages {
            warn!("{}", message);
        }
        debug!("Lint reported {} problem(s)", messages.len());
        Ok(TaskOutcome::from_errors(messages))
    }
}
