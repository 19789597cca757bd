//! Machine-readable run summary written next to the merged table.

use serde::{Deserialize, Serialize};

/// Schema tag for `merge_report.json`.
pub const MERGE_REPORT_SCHEMA: &str = "labmerge.merge-report";
pub const MERGE_REPORT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputCounts {
    pub trial_rows: usize,
    pub participant_rows: usize,
    pub trial_keys: usize,
    pub participant_keys: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscrepancyCounts {
    pub trial_only: usize,
    pub participant_only: usize,
    pub confirmed: usize,
    pub unconfirmed: usize,
}

impl DiscrepancyCounts {
    /// Size of the symmetric difference of the two key sets.
    pub fn total(&self) -> usize {
        self.trial_only + self.participant_only
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Passed,
    /// Passed with duplicate participant rows tolerated by policy.
    PassedWithDuplicates,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReport {
    pub schema: String,
    pub schema_version: u32,
    pub inputs: InputCounts,
    pub discrepancies: DiscrepancyCounts,
    pub matched_keys: usize,
    pub merged_rows: usize,
    pub verification: VerificationStatus,
    /// Lowercase hex SHA-256 of the merged table bytes, when written.
    pub merged_sha256: Option<String>,
}

impl MergeReport {
    pub fn new(
        inputs: InputCounts,
        discrepancies: DiscrepancyCounts,
        matched_keys: usize,
        merged_rows: usize,
        verification: VerificationStatus,
    ) -> Self {
        Self {
            schema: MERGE_REPORT_SCHEMA.to_string(),
            schema_version: MERGE_REPORT_SCHEMA_VERSION,
            inputs,
            discrepancies,
            matched_keys,
            merged_rows,
            verification,
            merged_sha256: None,
        }
    }
}
