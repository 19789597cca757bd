//! Tests for labmerge-model types.

use labmerge_model::{
    Discrepancy, DiscrepancyCounts, ExceptionEntry, ExceptionLedger, InputCounts, MergeReport,
    ModelError, NormalizedKey, SourceKind, SourceScope, VerificationStatus,
};

fn entry(lab: &str, subject: &str, confirmed: bool) -> ExceptionEntry {
    ExceptionEntry {
        lab: lab.to_string(),
        subject: subject.to_string(),
        confirmed,
    }
}

#[test]
fn source_kind_parses_and_flips() {
    assert_eq!("Trial".parse::<SourceKind>().unwrap(), SourceKind::Trial);
    assert_eq!(
        " participants ".parse::<SourceKind>().unwrap(),
        SourceKind::Participant
    );
    assert!("session".parse::<SourceKind>().is_err());
    assert_eq!(SourceKind::Trial.other(), SourceKind::Participant);
}

#[test]
fn scope_includes_matching_kinds() {
    assert!(SourceScope::Both.includes(SourceKind::Trial));
    assert!(SourceScope::Both.includes(SourceKind::Participant));
    assert!(SourceScope::Trial.includes(SourceKind::Trial));
    assert!(!SourceScope::Trial.includes(SourceKind::Participant));
    assert!(!SourceScope::Participant.includes(SourceKind::Trial));
}

#[test]
fn ledger_keys_are_canonicalized() {
    let ledger = ExceptionLedger::from_entries(vec![
        entry("Lancaster", "MB_0101", true),
        entry("kent", "7", false),
    ])
    .expect("ledger");

    assert_eq!(ledger.len(), 2);
    assert!(ledger.is_confirmed(&NormalizedKey::new("lancaster", "mb0101")));
    assert!(!ledger.is_confirmed(&NormalizedKey::new("kent", "7")));
    assert!(ledger.get(&NormalizedKey::new("kent", "7")).is_some());
    assert_eq!(ledger.confirmed_count(), 1);
}

#[test]
fn ledger_rejects_conflicting_duplicates() {
    let result = ExceptionLedger::from_entries(vec![
        entry("kent", "7", true),
        entry("KENT", "7", false),
    ]);
    assert!(matches!(
        result,
        Err(ModelError::DuplicateLedgerEntry { .. })
    ));
}

#[test]
fn ledger_tolerates_repeated_identical_rows() {
    let ledger = ExceptionLedger::from_entries(vec![
        entry("kent", "7", true),
        entry("Kent", "_7", true),
    ])
    .expect("ledger");
    assert_eq!(ledger.len(), 1);
}

#[test]
fn discrepancy_reports_the_present_side() {
    let discrepancy = Discrepancy {
        key: NormalizedKey::new("kent", "7"),
        missing_from: SourceKind::Participant,
        confirmed: false,
    };
    assert_eq!(discrepancy.present_in(), SourceKind::Trial);
}

#[test]
fn merge_report_serializes_without_timestamp() {
    let report = MergeReport::new(
        InputCounts {
            trial_rows: 6,
            participant_rows: 2,
            trial_keys: 2,
            participant_keys: 2,
        },
        DiscrepancyCounts {
            trial_only: 1,
            participant_only: 1,
            confirmed: 1,
            unconfirmed: 1,
        },
        1,
        3,
        VerificationStatus::Passed,
    );
    let json = serde_json::to_value(&report).expect("serialize report");
    assert_eq!(json["schema"], "labmerge.merge-report");
    assert_eq!(json["verification"], "passed");
    assert!(json.get("generated_at").is_none());
    assert_eq!(report.discrepancies.total(), 2);
}
