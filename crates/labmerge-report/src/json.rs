use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use labmerge_model::MergeReport;

use crate::error::Result;
use crate::write_bytes;

pub const MERGE_REPORT_FILE: &str = "merge_report.json";

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Pretty JSON with a trailing newline.
pub fn render_merge_report(report: &MergeReport) -> Result<Vec<u8>> {
    let json = serde_json::to_string_pretty(report)?;
    Ok(format!("{json}\n").into_bytes())
}

pub fn write_merge_report(dir: &Path, report: &MergeReport) -> Result<PathBuf> {
    write_bytes(dir, MERGE_REPORT_FILE, &render_merge_report(report)?)
}
