//! Tests for the output writers.

use labmerge_core::{
    JoinExecutor, NaturalJoin, NormalizedTable, Normalizer, SourceTable, aggregate_participants,
    aggregate_trials,
};
use labmerge_ingest::string_frame;
use labmerge_model::{
    DiscrepancyCounts, ExceptionEntry, ExceptionLedger, FieldNames, InputCounts, MergeReport,
    SourceKind, VerificationStatus,
};
use labmerge_report::{
    MERGE_REPORT_FILE, MERGED_FILE, clear_merge_outputs, render_lab_concordance,
    render_merge_report, render_merged, render_unconfirmed, sha256_hex, unconfirmed_rows,
    write_merge_report, write_merged,
};
use labmerge_validate::validate;

fn make_table(kind: SourceKind, columns: &[(&str, Vec<&str>)]) -> NormalizedTable {
    let columns = columns
        .iter()
        .map(|(name, values)| {
            (
                name.to_string(),
                values.iter().map(|value| value.to_string()).collect(),
            )
        })
        .collect();
    let frame = string_frame(columns).expect("frame");
    Normalizer::default().normalize_table(&SourceTable::new(kind, frame).expect("source"))
}

fn trial_table() -> NormalizedTable {
    make_table(
        SourceKind::Trial,
        &[
            ("lab", vec!["LANCSLAB", "lancaster", "kent", "kent", "uva"]),
            ("subject", vec!["MB_01", "mb01", "kent_4", "5", "003"]),
            ("trial", vec!["1", "2", "1", "1", "1"]),
            ("trial_error", vec!["", "", "E7", "", ""]),
        ],
    )
}

fn participant_table() -> NormalizedTable {
    make_table(
        SourceKind::Participant,
        &[
            ("lab", vec!["Lancaster", "Kent", "Oxon"]),
            ("subject", vec!["MB-01", "5", "subj_2"]),
            ("age", vec!["23", "31", "40"]),
            ("notes", vec!["left-handed", "", "withdrew, later returned"]),
        ],
    )
}

#[test]
fn lab_concordance_csv() {
    let fields = FieldNames::default();
    let trial = aggregate_trials(&trial_table(), &fields).expect("trial");
    let participant = aggregate_participants(&participant_table(), &fields).expect("participant");
    let ledger = ExceptionLedger::from_entries([ExceptionEntry {
        lab: "virginia".to_string(),
        subject: "3".to_string(),
        confirmed: true,
    }])
    .expect("ledger");
    let outcome = validate(&trial, &participant, &ledger);

    let csv = String::from_utf8(render_lab_concordance(&outcome.lab_summary).expect("render"))
        .expect("utf8");
    insta::assert_snapshot!(csv, @r"
    lab,trial_participants,participant_participants,trial_only,participant_only,confirmed,concordant
    kent,2,1,1,0,0,false
    lancaster,1,1,0,0,0,true
    oxford,0,1,0,1,0,false
    virginia,1,0,1,0,1,false
    ");

    let rows = unconfirmed_rows(&outcome, &trial, &participant);
    let csv = String::from_utf8(render_unconfirmed(&rows).expect("render")).expect("utf8");
    insta::assert_snapshot!(csv, @r#"
    lab,subject,in_trial,in_participant,missing_from,trial_rows,trial_count,trial_error,participant_rows,age,notes,session_error
    kent,4,true,false,participant,1,1,E7,,,,
    oxford,2,false,true,trial,,,,1,40,"withdrew, later returned",
    "#);
}

#[test]
fn merged_csv_is_byte_reproducible() {
    let render = || {
        let merged = NaturalJoin
            .join(&trial_table(), &participant_table())
            .expect("join");
        render_merged(&merged).expect("render")
    };
    let first = render();
    assert_eq!(first, render());

    let csv = String::from_utf8(first).expect("utf8");
    insta::assert_snapshot!(csv, @r"
    lab,subject,trial,trial_error,age,notes
    lancaster,mb01,1,,23,left-handed
    lancaster,mb01,2,,23,left-handed
    kent,5,1,,31,
    ");
}

#[test]
fn writers_create_output_directory() {
    let dir = tempfile::tempdir().expect("temp dir");
    let out = dir.path().join("nested").join("out");
    let merged = NaturalJoin
        .join(&trial_table(), &participant_table())
        .expect("join");

    let (path, bytes) = write_merged(&out, &merged).expect("write merged");
    assert_eq!(path, out.join(MERGED_FILE));
    assert_eq!(std::fs::read(&path).expect("read back"), bytes);

    let mut report = MergeReport::new(
        InputCounts {
            trial_rows: 5,
            participant_rows: 3,
            trial_keys: 4,
            participant_keys: 3,
        },
        DiscrepancyCounts {
            trial_only: 2,
            participant_only: 1,
            confirmed: 1,
            unconfirmed: 2,
        },
        2,
        merged.height(),
        VerificationStatus::Passed,
    );
    report.merged_sha256 = Some(sha256_hex(&bytes));
    let report_path = write_merge_report(&out, &report).expect("write report");
    assert_eq!(report_path, out.join(MERGE_REPORT_FILE));

    let written = std::fs::read(&report_path).expect("read report");
    assert_eq!(written, render_merge_report(&report).expect("render"));
    let parsed: MergeReport = serde_json::from_slice(&written).expect("parse report");
    assert_eq!(parsed, report);
}

#[test]
fn sha256_hex_is_lowercase_hex() {
    assert_eq!(
        sha256_hex(b""),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
}

#[test]
fn clearing_merge_outputs_tolerates_missing_files() {
    let dir = tempfile::tempdir().expect("temp dir");
    assert!(clear_merge_outputs(dir.path()).expect("nothing to clear").is_empty());

    let merged = NaturalJoin
        .join(&trial_table(), &participant_table())
        .expect("join");
    let (path, _) = write_merged(dir.path(), &merged).expect("write merged");
    let removed = clear_merge_outputs(dir.path()).expect("clear");
    assert_eq!(removed, vec![path.clone()]);
    assert!(!path.exists());
}
