use serde::{Deserialize, Serialize};

/// Canonical column holding the raw lab identifier.
pub const LAB: &str = "lab";
/// Canonical column holding the raw subject identifier.
pub const SUBJECT: &str = "subject";
/// Provenance column added by the row reader.
pub const ORIGIN_FILE: &str = "origin_file";

/// Canonical names of the non-key fields the aggregator reads.
///
/// Columns that are absent from a source are treated as empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldNames {
    /// Trial number on the trial side.
    pub trial: String,
    /// Per-trial error code on the trial side.
    pub trial_error: String,
    /// Participant age.
    pub age: String,
    /// Free-text participant notes.
    pub notes: String,
    /// Session-level error code on the participant side.
    pub session_error: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            trial: "trial".to_string(),
            trial_error: "trial_error".to_string(),
            age: "age".to_string(),
            notes: "notes".to_string(),
            session_error: "session_error".to_string(),
        }
    }
}
