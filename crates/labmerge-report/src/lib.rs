//! Output writers.
//!
//! Every writer renders to bytes first so content can be hashed and
//! snapshot-tested; nothing here depends on wall-clock time.

mod csv_out;
mod error;
mod json;

pub use csv_out::{
    LAB_CONCORDANCE_FILE, MERGED_FILE, UNCONFIRMED_FILE, UnconfirmedRow, render_lab_concordance,
    render_merged, render_unconfirmed, unconfirmed_rows, write_lab_concordance, write_merged,
    write_unconfirmed,
};
pub use error::{ReportError, Result};
pub use json::{MERGE_REPORT_FILE, render_merge_report, sha256_hex, write_merge_report};

use std::path::{Path, PathBuf};

/// Create `dir` (and parents) if needed.
pub fn ensure_output_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|source| ReportError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })
}

/// Remove `merged.csv` and `merge_report.json` left by an earlier run in `dir`.
///
/// Returns the paths that were removed. Missing files are not an error.
pub fn clear_merge_outputs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for name in [MERGED_FILE, MERGE_REPORT_FILE] {
        let path = dir.join(name);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "removed stale output");
                removed.push(path);
            }
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => return Err(ReportError::Remove { path, source }),
        }
    }
    Ok(removed)
}

pub(crate) fn write_bytes(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
    ensure_output_dir(dir)?;
    let path = dir.join(name);
    std::fs::write(&path, bytes).map_err(|source| ReportError::Write {
        path: path.clone(),
        source,
    })?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "wrote output");
    Ok(path)
}
