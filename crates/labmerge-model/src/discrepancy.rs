use serde::{Deserialize, Serialize};

use crate::{NormalizedKey, SourceKind};

/// A key present in exactly one source's key set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub key: NormalizedKey,
    /// The source the key is absent from.
    pub missing_from: SourceKind,
    /// Whether the exception ledger confirms this key as expected.
    pub confirmed: bool,
}

impl Discrepancy {
    /// The source the key was observed in.
    pub fn present_in(&self) -> SourceKind {
        self.missing_from.other()
    }
}

/// Per-lab audit row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabConcordance {
    pub lab: String,
    /// Distinct subjects for this lab in the trial data.
    pub trial_participants: usize,
    /// Distinct subjects for this lab in the participant data.
    pub participant_participants: usize,
    pub trial_only: usize,
    pub participant_only: usize,
    /// One-sided keys suppressed by a confirmed ledger entry.
    pub confirmed: usize,
    pub concordant: bool,
}
