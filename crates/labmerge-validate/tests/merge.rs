//! Tests for pre-merge reconciliation against the exception ledger.

use std::collections::BTreeSet;

use labmerge_core::{
    NormalizedTable, Normalizer, ParticipantAggregates, SourceTable, TrialAggregates,
    aggregate_participants, aggregate_trials,
};
use labmerge_ingest::string_frame;
use labmerge_model::{
    ExceptionEntry, ExceptionLedger, FieldNames, NormalizedKey, SourceKind,
};
use labmerge_validate::validate;
use proptest::prelude::*;

fn make_table(kind: SourceKind, rows: &[(&str, &str)]) -> NormalizedTable {
    let frame = string_frame(vec![
        (
            "lab".to_string(),
            rows.iter().map(|(lab, _)| lab.to_string()).collect(),
        ),
        (
            "subject".to_string(),
            rows.iter().map(|(_, subject)| subject.to_string()).collect(),
        ),
    ])
    .expect("frame");
    Normalizer::default().normalize_table(&SourceTable::new(kind, frame).expect("source"))
}

fn aggregates(
    trial: &[(&str, &str)],
    participant: &[(&str, &str)],
) -> (TrialAggregates, ParticipantAggregates) {
    let fields = FieldNames::default();
    (
        aggregate_trials(&make_table(SourceKind::Trial, trial), &fields).expect("trial"),
        aggregate_participants(&make_table(SourceKind::Participant, participant), &fields)
            .expect("participant"),
    )
}

fn ledger(entries: &[(&str, &str, bool)]) -> ExceptionLedger {
    ExceptionLedger::from_entries(entries.iter().map(|(lab, subject, confirmed)| {
        ExceptionEntry {
            lab: lab.to_string(),
            subject: subject.to_string(),
            confirmed: *confirmed,
        }
    }))
    .expect("ledger")
}

#[test]
fn confirmed_trial_only_key_is_suppressed_and_counted() {
    let (trial, participant) = aggregates(
        &[("kent", "1"), ("kent", "2"), ("kent", "3")],
        &[("kent", "1"), ("kent", "4")],
    );
    let ledger = ledger(&[("Kent", "2", true), ("kent", "3", false)]);
    let outcome = validate(&trial, &participant, &ledger);

    assert_eq!(outcome.discrepancies.len(), 3);
    let unconfirmed: Vec<&NormalizedKey> = outcome.unconfirmed().map(|d| &d.key).collect();
    assert_eq!(
        unconfirmed,
        vec![&NormalizedKey::new("kent", "3"), &NormalizedKey::new("kent", "4")]
    );

    let kent = &outcome.lab_summary[0];
    assert_eq!(kent.lab, "kent");
    assert_eq!(kent.trial_participants, 3);
    assert_eq!(kent.participant_participants, 2);
    assert_eq!(kent.trial_only, 2);
    assert_eq!(kent.participant_only, 1);
    assert_eq!(kent.confirmed, 1);
    assert!(!kent.concordant);

    let counts = outcome.counts();
    assert_eq!(counts.trial_only, 2);
    assert_eq!(counts.participant_only, 1);
    assert_eq!(counts.confirmed, 1);
    assert_eq!(counts.unconfirmed, 2);
    assert_eq!(outcome.matched_keys, 1);
    assert_eq!(outcome.unused_ledger_entries, 0);
}

#[test]
fn ledger_rows_with_raw_site_codes_are_reported_unused() {
    let (trial, participant) = aggregates(
        &[("LANCSLAB", "MB_01"), ("LANCSLAB", "MB_02")],
        &[("LANCSLAB", "MB_01")],
    );
    let ledger = ledger(&[("LANCSLAB", "MB_02", true), ("lancaster", "mb99", false)]);
    let outcome = validate(&trial, &participant, &ledger);

    assert_eq!(outcome.unused_ledger_entries, 1);
    let unconfirmed: Vec<&NormalizedKey> = outcome.unconfirmed().map(|d| &d.key).collect();
    assert_eq!(unconfirmed, vec![&NormalizedKey::new("lancaster", "mb02")]);
}

#[test]
fn discrepancies_record_the_missing_side() {
    let (trial, participant) = aggregates(&[("uva", "007")], &[("oxon", "subj_1")]);
    let outcome = validate(&trial, &participant, &ExceptionLedger::new());
    let sides: Vec<(String, SourceKind, SourceKind)> = outcome
        .discrepancies
        .iter()
        .map(|d| (d.key.to_string(), d.missing_from, d.present_in()))
        .collect();
    assert_eq!(
        sides,
        vec![
            (
                "oxford/1".to_string(),
                SourceKind::Trial,
                SourceKind::Participant
            ),
            (
                "virginia/7".to_string(),
                SourceKind::Participant,
                SourceKind::Trial
            ),
        ]
    );
    assert_eq!(outcome.lab_summary.len(), 2);
    assert!(!outcome.is_clean());
}

#[test]
fn matching_sources_are_concordant() {
    let (trial, participant) = aggregates(
        &[("LANCSLAB", "MB_01"), ("LANCSLAB", "MB_01")],
        &[("lancaster", "mb01")],
    );
    let outcome = validate(&trial, &participant, &ExceptionLedger::new());
    assert!(outcome.is_clean());
    assert!(outcome.lab_summary[0].concordant);
    assert_eq!(outcome.matched_keys, 1);
}

fn key_set() -> impl Strategy<Value = BTreeSet<(u8, u8)>> {
    prop::collection::btree_set((0u8..3, 0u8..12), 0..20)
}

proptest! {
    #[test]
    fn unconfirmed_plus_confirmed_covers_symmetric_difference(
        trial_keys in key_set(),
        participant_keys in key_set(),
        ledger_keys in key_set(),
    ) {
        let labs = ["kent", "york", "oxford"];
        let to_rows = |keys: &BTreeSet<(u8, u8)>| -> Vec<(String, String)> {
            keys.iter()
                .map(|(lab, subject)| (labs[*lab as usize].to_string(), format!("s{subject}")))
                .collect()
        };
        let trial_rows = to_rows(&trial_keys);
        let participant_rows = to_rows(&participant_keys);
        let trial_refs: Vec<(&str, &str)> =
            trial_rows.iter().map(|(a, b)| (a.as_str(), b.as_str())).collect();
        let participant_refs: Vec<(&str, &str)> =
            participant_rows.iter().map(|(a, b)| (a.as_str(), b.as_str())).collect();
        let (trial, participant) = aggregates(&trial_refs, &participant_refs);

        let ledger_rows = to_rows(&ledger_keys);
        let entries: Vec<(&str, &str, bool)> =
            ledger_rows.iter().map(|(a, b)| (a.as_str(), b.as_str(), true)).collect();
        let outcome = validate(&trial, &participant, &ledger(&entries));

        let symmetric: usize = trial_keys.symmetric_difference(&participant_keys).count();
        let counts = outcome.counts();
        prop_assert_eq!(counts.unconfirmed + counts.confirmed, symmetric);
        prop_assert_eq!(counts.total(), symmetric);
        prop_assert_eq!(outcome.unconfirmed().count(), counts.unconfirmed);

        let exercised = trial_keys
            .symmetric_difference(&participant_keys)
            .filter(|key| ledger_keys.contains(key))
            .count();
        prop_assert_eq!(counts.confirmed, exercised);
        prop_assert_eq!(
            outcome.matched_keys,
            trial_keys.intersection(&participant_keys).count()
        );
    }
}
