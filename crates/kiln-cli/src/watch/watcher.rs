//! File system watcher feeding the rebuild controller.
//!
//! Watches the project root recursively and drops events for the output
//! directory, configured ignore patterns and hidden files.

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

use crate::error::{CliError, Result};

/// File change event type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    Modified(PathBuf),
    Created(PathBuf),
    Removed(PathBuf),
}

impl FileChange {
    /// Get the path affected by this change.
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Modified(p) | FileChange::Created(p) | FileChange::Removed(p) => p,
        }
    }
}

/// Recursive watcher sending [`FileChange`]s through a channel.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl FileWatcher {
    /// Start watching `root`.
    ///
    /// `ignore_patterns` are paths relative to the root (directory prefixes)
    /// or `*.ext` suffixes.
    pub fn new(
        root: PathBuf,
        ignore_patterns: Vec<String>,
    ) -> Result<(Self, mpsc::Receiver<FileChange>)> {
        if !root.exists() {
            return Err(CliError::FileNotFound(root));
        }

        let (tx, rx) = mpsc::channel(100);
        let watch_root = root.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!("File watcher error: {}", e);
                    return;
                }
            };

            for path in &event.paths {
                if Self::should_ignore(path, &watch_root, &ignore_patterns) {
                    continue;
                }

                let change = match event.kind {
                    notify::EventKind::Create(_) => FileChange::Created(path.clone()),
                    notify::EventKind::Modify(_) => FileChange::Modified(path.clone()),
                    notify::EventKind::Remove(_) => FileChange::Removed(path.clone()),
                    _ => continue,
                };

                // Blocks the notify thread while a rebuild drains the channel.
                let _ = tx.blocking_send(change);
            }
        })?;

        watcher.watch(&root, RecursiveMode::Recursive)?;

        Ok((
            Self {
                _watcher: watcher,
                root,
            },
            rx,
        ))
    }

    fn should_ignore(path: &Path, root: &Path, ignore_patterns: &[String]) -> bool {
        let Ok(rel_path) = path.strip_prefix(root) else {
            return true;
        };

        let path_str = rel_path.to_string_lossy();

        for pattern in ignore_patterns {
            let pattern = pattern.trim_start_matches("./").trim_end_matches('/');
            if let Some(ext) = pattern.strip_prefix('*') {
                if path_str.ends_with(ext) {
                    return true;
                }
            } else if rel_path.starts_with(pattern) {
                return true;
            }
        }

        rel_path.components().any(|component| {
            component
                .as_os_str()
                .to_str()
                .is_some_and(|name| name.starts_with('.') && name != "." && name != "..")
        })
    }

    /// Get the root directory being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ignored(path: &str, patterns: &[&str]) -> bool {
        let patterns: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
        FileWatcher::should_ignore(Path::new(path), Path::new("/project"), &patterns)
    }

    #[test]
    fn test_should_ignore_output_and_node_modules() {
        let patterns = ["dist", "node_modules"];
        assert!(ignored("/project/dist/app/bundle.js", &patterns));
        assert!(ignored("/project/node_modules/es6-shim/es6-shim.js", &patterns));
        assert!(!ignored("/project/app/main.ts", &patterns));
        assert!(!ignored("/project/distant/notes.ts", &patterns));
    }

    #[test]
    fn test_should_ignore_extension() {
        assert!(ignored("/project/debug.log", &["*.log"]));
        assert!(!ignored("/project/app/main.ts", &["*.log"]));
    }

    #[test]
    fn test_should_ignore_hidden_and_outside() {
        assert!(ignored("/project/.git/index", &[]));
        assert!(ignored("/project/app/.main.ts.swp", &[]));
        assert!(ignored("/elsewhere/app/main.ts", &[]));
    }

    #[test]
    fn test_file_change_path() {
        let path = PathBuf::from("/project/app/main.ts");
        assert_eq!(FileChange::Removed(path.clone()).path(), path.as_path());
    }
}
