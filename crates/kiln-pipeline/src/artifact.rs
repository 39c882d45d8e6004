//! Bundle artifacts and atomic output writes.
//!
//! The writes run on tokio's blocking pool; this module is the one place
//! pipeline code touches `std::fs` directly.

#![allow(clippy::disallowed_methods)]

use path_clean::PathClean;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{PipelineError, Result};

/// One output file held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub path: PathBuf,
    pub bytes: Arc<[u8]>,
}

impl OutputFile {
    pub fn new(path: impl Into<PathBuf>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            path: path.into(),
            bytes: bytes.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A built bundle: its code plus the accompanying source map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub bundle: OutputFile,
    pub source_map: Option<OutputFile>,
}

impl Artifact {
    /// Total bytes of bundle and map.
    pub fn total_size(&self) -> u64 {
        (self.bundle.len() + self.source_map.as_ref().map_or(0, OutputFile::len)) as u64
    }

    /// Write bundle and map under `out_root`.
    pub async fn write(&self, out_root: &Path) -> Result<()> {
        let mut files = vec![&self.bundle];
        files.extend(self.source_map.as_ref());
        write_files_atomic(out_root, &files).await
    }
}

/// Resolve `target` and make sure it stays inside `base_dir`.
pub fn validate_output_path(base_dir: &Path, target: &Path) -> Result<PathBuf> {
    if target.to_string_lossy().contains('\0') {
        return Err(PipelineError::InvalidOutputPath(
            "Filename contains null byte".to_string(),
        ));
    }

    let base_dir = base_dir.clean();
    let full_path = base_dir.join(target).clean();
    if !full_path.starts_with(&base_dir) {
        return Err(PipelineError::InvalidOutputPath(format!(
            "Path '{}' escapes output directory '{}'",
            target.display(),
            base_dir.display()
        )));
    }

    Ok(full_path)
}

/// Write several files so that each either keeps its previous content or
/// gets the complete new content.
///
/// Every file goes to a `<name>.tmp` sibling first; only when all temp files
/// are written are they renamed into place.
pub async fn write_files_atomic(out_root: &Path, files: &[&OutputFile]) -> Result<()> {
    let out_root = out_root.to_path_buf();
    let files: Vec<OutputFile> = files.iter().map(|&file| file.clone()).collect();

    tokio::task::spawn_blocking(move || write_staged(&out_root, &files)).await?
}

fn write_staged(out_root: &Path, files: &[OutputFile]) -> Result<()> {
    let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(files.len());

    for file in files {
        let target = validate_output_path(out_root, &file.path).inspect_err(|_| {
            cleanup_temp_files(&staged);
        })?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                cleanup_temp_files(&staged);
                PipelineError::io("Failed to create directory", parent, e)
            })?;
        }

        let mut temp_name = target.file_name().unwrap_or_default().to_os_string();
        temp_name.push(".tmp");
        let temp_path = target.with_file_name(temp_name);
        fs::write(&temp_path, &file.bytes).map_err(|e| {
            cleanup_temp_files(&staged);
            PipelineError::io("Failed to write temporary file", &temp_path, e)
        })?;
        staged.push((temp_path, target));
    }

    for (temp_path, target) in &staged {
        fs::rename(temp_path, target).map_err(|e| {
            cleanup_temp_files(&staged);
            PipelineError::io("Failed to move into place", target, e)
        })?;
    }

    Ok(())
}

fn cleanup_temp_files(staged: &[(PathBuf, PathBuf)]) {
    for (temp_path, _) in staged {
        if !temp_path.exists() {
            continue;
        }
        if let Err(e) = fs::remove_file(temp_path) {
            tracing::warn!(
                "Failed to clean up temporary file '{}': {}",
                temp_path.display(),
                e
            );
        }
    }
}
