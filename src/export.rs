//! SVG export of the displayed diagram.

use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::render::OutputArea;

/// File name every export is written under.
pub const EXPORT_FILE_NAME: &str = "chart.svg";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No diagram to export")]
    NoDiagram,
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Write the displayed diagram to `dir/chart.svg`.
///
/// The file is written to a temporary name first and renamed into place, so
/// a failed export never leaves a partial `chart.svg` behind.
///
/// # Errors
///
/// [`ExportError::NoDiagram`] when nothing is displayed (nothing is written),
/// [`ExportError::Write`] when the file cannot be written.
pub fn export_svg(output: &OutputArea, dir: &Path) -> Result<PathBuf, ExportError> {
    let svg = output.svg().ok_or(ExportError::NoDiagram)?;
    let path = dir.join(EXPORT_FILE_NAME);
    let write_err = |source| ExportError::Write {
        path: path.clone(),
        source,
    };

    let mut file = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    file.write_all(svg.as_bytes()).map_err(write_err)?;
    file.persist(&path).map_err(|err| write_err(err.error))?;
    crate::perf::log_event("export.write", format!("path={} bytes={}", path.display(), svg.len()));
    Ok(path)
}

/// Remove a previously exported `dir/chart.svg`.
///
/// Called when the displayed diagram is replaced by a failure, so the output
/// directory never holds a diagram for a source that no longer renders. A
/// missing file is not an error.
///
/// # Errors
///
/// [`ExportError::Write`] when an existing file cannot be removed.
pub fn remove_export(dir: &Path) -> Result<(), ExportError> {
    let path = dir.join(EXPORT_FILE_NAME);
    match std::fs::remove_file(&path) {
        Ok(()) => {
            crate::perf::log_event("export.remove", format!("path={}", path.display()));
            Ok(())
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(ExportError::Write { path, source }),
    }
}
