use std::collections::BTreeMap;
use std::path::PathBuf;

use labmerge_model::{DiscrepancyCounts, InputCounts, LabConcordance, VerificationStatus};

/// Files produced by a merge run. Everything is `None` on a dry run.
#[derive(Debug, Default)]
pub struct OutputPaths {
    pub merged: Option<PathBuf>,
    pub unconfirmed: Option<PathBuf>,
    pub lab_concordance: Option<PathBuf>,
    pub report: Option<PathBuf>,
}

#[derive(Debug)]
pub struct MergeResult {
    pub output_dir: PathBuf,
    pub inputs: InputCounts,
    pub discrepancies: DiscrepancyCounts,
    pub lab_summary: Vec<LabConcordance>,
    pub matched_keys: usize,
    pub merged_rows: usize,
    pub verification: VerificationStatus,
    /// Rows rewritten per rule id, both sources combined.
    pub rule_hits: BTreeMap<String, usize>,
    pub outputs: OutputPaths,
    pub dry_run: bool,
}
