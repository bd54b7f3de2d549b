//! In-place post-processing of an exported HTML tree.

use std::{
    ffi::OsStr,
    fmt, fs, io,
    path::{Path, PathBuf},
};

use walkdir::WalkDir;

use crate::domain::Transformer;

/// Error preventing a directory from being processed at all.
#[derive(Debug, thiserror::Error)]
pub enum WalkError {
    /// The root is missing or is not a directory.
    #[error("Directory not found: {}", .0.display())]
    NotFound(PathBuf),
}

/// Outcome of post-processing a directory.
///
/// A failure on one file never stops the others; failures are collected here.
#[derive(Debug, Default)]
pub struct WalkReport {
    processed: Vec<PathBuf>,
    rewritten: usize,
    failures: Vec<(PathBuf, io::Error)>,
}

impl WalkReport {
    /// Number of HTML files read, transformed, and (if needed) written back.
    #[must_use]
    pub fn processed(&self) -> usize {
        self.processed.len()
    }

    /// Paths of the files that were processed, in walk order.
    #[must_use]
    pub fn processed_paths(&self) -> &[PathBuf] {
        &self.processed
    }

    /// Number of processed files whose content actually changed.
    #[must_use]
    pub const fn rewritten(&self) -> usize {
        self.rewritten
    }

    /// Files that could not be read or written.
    #[must_use]
    pub fn failures(&self) -> &[(PathBuf, io::Error)] {
        &self.failures
    }

    /// Whether every file was processed successfully.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for WalkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Post-processed {} HTML file(s), {} rewritten",
            self.processed(),
            self.rewritten
        )?;
        if !self.failures.is_empty() {
            write!(f, ", {} failed", self.failures.len())?;
        }
        Ok(())
    }
}

/// Post-processes every `.html` file under `root` in place.
///
/// # Errors
///
/// Returns [`WalkError::NotFound`] if `root` is not a directory. Per-file I/O
/// failures are reported in the [`WalkReport`] instead.
pub fn postprocess_directory(root: &Path, project_name: &str) -> Result<WalkReport, WalkError> {
    postprocess_directory_with(root, &Transformer::for_project(project_name))
}

/// Post-processes every `.html` file under `root` in place using an existing
/// transformer.
///
/// Files are visited sequentially in lexical order. A file is only written
/// when its transformed content differs from what is on disk.
///
/// # Errors
///
/// Returns [`WalkError::NotFound`] if `root` is not a directory.
pub fn postprocess_directory_with(
    root: &Path,
    transformer: &Transformer,
) -> Result<WalkReport, WalkError> {
    if !root.is_dir() {
        return Err(WalkError::NotFound(root.to_path_buf()));
    }

    let mut report = WalkReport::default();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().unwrap_or(root).to_path_buf();
                tracing::warn!("Failed to read directory entry {}: {e}", path.display());
                report.failures.push((path, e.into()));
                continue;
            }
        };
        if !entry.file_type().is_file() || entry.path().extension() != Some(OsStr::new("html")) {
            continue;
        }

        let path = entry.into_path();
        let relative = path.strip_prefix(root).unwrap_or(&path);
        tracing::debug!("Processing: {}", relative.display());

        match process_file(&path, transformer) {
            Ok(changed) => {
                if changed {
                    report.rewritten += 1;
                }
                report.processed.push(path);
            }
            Err(e) => {
                tracing::warn!("Failed to post-process {}: {e}", path.display());
                report.failures.push((path, e));
            }
        }
    }

    tracing::info!("{report}");
    Ok(report)
}

fn process_file(path: &Path, transformer: &Transformer) -> io::Result<bool> {
    let original = fs::read_to_string(path)?;
    let transformed = transformer.transform(&original);
    if transformed == original {
        return Ok(false);
    }
    fs::write(path, transformed)?;
    Ok(true)
}
