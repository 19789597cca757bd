use std::collections::{BTreeMap, BTreeSet};

use tracing::{info, warn};

use labmerge_core::{ParticipantAggregates, TrialAggregates};
use labmerge_model::{
    Discrepancy, DiscrepancyCounts, ExceptionLedger, LabConcordance, NormalizedKey, SourceKind,
};

/// Result of reconciling the two key sets against the exception ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    /// Every one-sided key, sorted by key.
    pub discrepancies: Vec<Discrepancy>,
    /// One row per lab seen on either side, sorted by lab.
    pub lab_summary: Vec<LabConcordance>,
    /// Keys present on both sides.
    pub matched_keys: usize,
    /// Confirmed ledger entries that matched no discrepancy.
    pub unused_ledger_entries: usize,
}

impl ValidationOutcome {
    /// Discrepancies the ledger does not explain.
    pub fn unconfirmed(&self) -> impl Iterator<Item = &Discrepancy> {
        self.discrepancies.iter().filter(|item| !item.confirmed)
    }

    pub fn unconfirmed_keys(&self) -> BTreeSet<NormalizedKey> {
        self.unconfirmed().map(|item| item.key.clone()).collect()
    }

    pub fn counts(&self) -> DiscrepancyCounts {
        let mut counts = DiscrepancyCounts::default();
        for item in &self.discrepancies {
            match item.missing_from {
                SourceKind::Participant => counts.trial_only += 1,
                SourceKind::Trial => counts.participant_only += 1,
            }
            if item.confirmed {
                counts.confirmed += 1;
            } else {
                counts.unconfirmed += 1;
            }
        }
        counts
    }

    pub fn is_clean(&self) -> bool {
        self.unconfirmed().next().is_none()
    }
}

fn lab_row<'a>(
    labs: &'a mut BTreeMap<String, LabConcordance>,
    lab: &str,
) -> &'a mut LabConcordance {
    labs.entry(lab.to_string())
        .or_insert_with(|| LabConcordance {
            lab: lab.to_string(),
            trial_participants: 0,
            participant_participants: 0,
            trial_only: 0,
            participant_only: 0,
            confirmed: 0,
            concordant: false,
        })
}

/// Compute the symmetric difference of the two key sets and check each
/// one-sided key against the ledger.
pub fn validate(
    trial: &TrialAggregates,
    participant: &ParticipantAggregates,
    ledger: &ExceptionLedger,
) -> ValidationOutcome {
    let mut discrepancies = Vec::new();
    let mut labs: BTreeMap<String, LabConcordance> = BTreeMap::new();
    let mut matched_keys = 0usize;

    let keys: BTreeSet<&NormalizedKey> = trial.keys().chain(participant.keys()).collect();
    for key in keys {
        let in_trial = trial.contains_key(key);
        let in_participant = participant.contains_key(key);
        let row = lab_row(&mut labs, &key.lab);
        if in_trial {
            row.trial_participants += 1;
        }
        if in_participant {
            row.participant_participants += 1;
        }
        let missing_from = match (in_trial, in_participant) {
            (true, true) => {
                matched_keys += 1;
                continue;
            }
            (true, false) => {
                row.trial_only += 1;
                SourceKind::Participant
            }
            _ => {
                row.participant_only += 1;
                SourceKind::Trial
            }
        };
        let confirmed = ledger.is_confirmed(key);
        if confirmed {
            row.confirmed += 1;
        }
        discrepancies.push(Discrepancy {
            key: key.clone(),
            missing_from,
            confirmed,
        });
    }

    let lab_summary: Vec<LabConcordance> = labs
        .into_values()
        .map(|mut row| {
            row.concordant = row.trial_participants == row.participant_participants;
            row
        })
        .collect();

    let unused = ledger
        .iter()
        .filter(|(key, entry)| {
            entry.confirmed
                && discrepancies
                    .binary_search_by(|item| item.key.cmp(*key))
                    .is_err()
        })
        .count();
    if unused > 0 {
        warn!(
            entries = unused,
            "confirmed ledger entries did not match any discrepancy; ledger keys must use normalized identifiers"
        );
    }

    let outcome = ValidationOutcome {
        discrepancies,
        lab_summary,
        matched_keys,
        unused_ledger_entries: unused,
    };
    let counts = outcome.counts();
    info!(
        matched_keys,
        trial_only = counts.trial_only,
        participant_only = counts.participant_only,
        confirmed = counts.confirmed,
        unconfirmed = counts.unconfirmed,
        "merge validation complete"
    );
    for row in outcome.lab_summary.iter().filter(|row| !row.concordant) {
        warn!(
            lab = %row.lab,
            trial_participants = row.trial_participants,
            participant_participants = row.participant_participants,
            "lab subject counts differ"
        );
    }
    outcome
}
