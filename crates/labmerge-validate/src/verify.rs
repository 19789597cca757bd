use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;
use tracing::{info, warn};

use labmerge_core::{MergedTable, ParticipantAggregates, TrialAggregates};
use labmerge_ingest::column_strings;
use labmerge_model::{FieldNames, NormalizedKey, VerificationStatus};

/// How matched keys with more than one participant row are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Report them as [`IntegrityViolation::DuplicateParticipantRows`].
    #[default]
    Fatal,
    /// Expect `trial rows x participant rows` merged rows and warn.
    Allow,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityViolation {
    #[error("{key}: expected {expected} merged rows, found {actual}")]
    RowCountMismatch {
        key: NormalizedKey,
        expected: usize,
        actual: usize,
    },
    #[error("{key}: expected {expected} distinct trials, found {actual}")]
    TrialCountMismatch {
        key: NormalizedKey,
        expected: usize,
        actual: usize,
    },
    #[error("{key}: {participant_rows} participant rows share this key")]
    DuplicateParticipantRows {
        key: NormalizedKey,
        participant_rows: usize,
    },
    #[error("{key}: merged key is missing from a pre-merge aggregate")]
    UnexpectedKey { key: NormalizedKey },
}

impl IntegrityViolation {
    pub fn key(&self) -> &NormalizedKey {
        match self {
            Self::RowCountMismatch { key, .. }
            | Self::TrialCountMismatch { key, .. }
            | Self::DuplicateParticipantRows { key, .. }
            | Self::UnexpectedKey { key } => key,
        }
    }

    /// The violation without its key, for logs that redact identifiers.
    pub fn detail(&self) -> String {
        match self {
            Self::RowCountMismatch {
                expected, actual, ..
            } => format!("expected {expected} merged rows, found {actual}"),
            Self::TrialCountMismatch {
                expected, actual, ..
            } => format!("expected {expected} distinct trials, found {actual}"),
            Self::DuplicateParticipantRows {
                participant_rows, ..
            } => format!("{participant_rows} participant rows share this key"),
            Self::UnexpectedKey { .. } => {
                "merged key is missing from a pre-merge aggregate".to_string()
            }
        }
    }
}

/// The merged table does not conserve the pre-merge records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "merge integrity check failed with {} violation(s); first: {}",
    .violations.len(),
    first_violation(.violations)
)]
pub struct IntegrityError {
    pub violations: Vec<IntegrityViolation>,
}

fn first_violation(violations: &[IntegrityViolation]) -> String {
    violations
        .first()
        .map(ToString::to_string)
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationSummary {
    /// Matched keys whose counts were checked.
    pub checked_keys: usize,
    pub merged_rows: usize,
    /// Matched keys with more than one participant row, tolerated by policy.
    pub duplicate_keys: Vec<NormalizedKey>,
    pub status: VerificationStatus,
}

#[derive(Default)]
struct MergedCounts<'a> {
    rows: usize,
    trials: BTreeSet<&'a str>,
}

/// Post-merge conservation check using the default field names.
pub fn verify(
    merged: &MergedTable,
    pre_trial: &TrialAggregates,
    pre_participant: &ParticipantAggregates,
    unconfirmed: &BTreeSet<NormalizedKey>,
    policy: DuplicatePolicy,
) -> Result<VerificationSummary, IntegrityError> {
    verify_with_fields(
        merged,
        pre_trial,
        pre_participant,
        unconfirmed,
        policy,
        &FieldNames::default(),
    )
}

/// Recompute per-key row and trial counts over the merged table and compare
/// them with the pre-merge aggregates.
///
/// Only keys present in both aggregates and not in `unconfirmed` are
/// checked. Trials are counted from the trial-side column only, never from a
/// participant column that happens to share its name. Any violation fails the
/// whole run.
pub fn verify_with_fields(
    merged: &MergedTable,
    pre_trial: &TrialAggregates,
    pre_participant: &ParticipantAggregates,
    unconfirmed: &BTreeSet<NormalizedKey>,
    policy: DuplicatePolicy,
    fields: &FieldNames,
) -> Result<VerificationSummary, IntegrityError> {
    let trial_values = if merged.is_trial_column(&fields.trial) {
        column_strings(&merged.data, &fields.trial).unwrap_or_default()
    } else {
        Vec::new()
    };
    let mut counts: BTreeMap<&NormalizedKey, MergedCounts<'_>> = BTreeMap::new();
    for (row, key) in merged.keys.iter().enumerate() {
        let entry = counts.entry(key).or_default();
        entry.rows += 1;
        if let Some(trial) = trial_values.get(row).map(|value| value.trim())
            && !trial.is_empty()
        {
            entry.trials.insert(trial);
        }
    }

    let mut violations = Vec::new();
    for key in counts.keys() {
        if !pre_trial.contains_key(*key) || !pre_participant.contains_key(*key) {
            violations.push(IntegrityViolation::UnexpectedKey {
                key: (*key).clone(),
            });
        }
    }

    let empty = MergedCounts::default();
    let mut checked_keys = 0usize;
    let mut duplicate_keys = Vec::new();
    for (key, trial) in pre_trial {
        let Some(participant) = pre_participant.get(key) else {
            continue;
        };
        if unconfirmed.contains(key) {
            continue;
        }
        checked_keys += 1;
        let actual = counts.get(key).unwrap_or(&empty);

        let mut expected_rows = trial.row_count;
        if participant.row_count > 1 {
            match policy {
                DuplicatePolicy::Fatal => {
                    violations.push(IntegrityViolation::DuplicateParticipantRows {
                        key: key.clone(),
                        participant_rows: participant.row_count,
                    });
                    continue;
                }
                DuplicatePolicy::Allow => {
                    warn!(
                        lab = %key.lab,
                        participant_rows = participant.row_count,
                        trial_rows = trial.row_count,
                        "duplicate participant rows inflate merged rows"
                    );
                    expected_rows = trial.row_count * participant.row_count;
                    duplicate_keys.push(key.clone());
                }
            }
        }

        if actual.rows != expected_rows {
            violations.push(IntegrityViolation::RowCountMismatch {
                key: key.clone(),
                expected: expected_rows,
                actual: actual.rows,
            });
        }
        if actual.trials.len() != trial.trial_count() {
            violations.push(IntegrityViolation::TrialCountMismatch {
                key: key.clone(),
                expected: trial.trial_count(),
                actual: actual.trials.len(),
            });
        }
    }

    if !violations.is_empty() {
        return Err(IntegrityError { violations });
    }

    let status = if duplicate_keys.is_empty() {
        VerificationStatus::Passed
    } else {
        VerificationStatus::PassedWithDuplicates
    };
    info!(
        checked_keys,
        merged_rows = merged.height(),
        duplicate_keys = duplicate_keys.len(),
        "post-merge verification passed"
    );
    Ok(VerificationSummary {
        checked_keys,
        merged_rows: merged.height(),
        duplicate_keys,
        status,
    })
}
