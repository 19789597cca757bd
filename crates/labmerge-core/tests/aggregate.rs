//! Tests for pre-merge aggregation.

use labmerge_core::{
    CoreError, NormalizedTable, Normalizer, ParticipantAggregate, SourceTable, TrialAggregate,
    aggregate, aggregate_participants, aggregate_partitioned, aggregate_trials,
};
use labmerge_ingest::string_frame;
use labmerge_model::{FieldNames, NormalizedKey, SourceKind};
use proptest::prelude::*;

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
    let source = SourceTable::new(kind, frame).expect("source");
    Normalizer::default().normalize_table(&source)
}

fn trial_table() -> NormalizedTable {
    make_table(
        SourceKind::Trial,
        &[
            ("lab", vec!["kent", "kent", "KENT", "lancs", "kent"]),
            ("subject", vec!["kent_1", "1", "01", "7", "1"]),
            ("trial", vec!["1", "2", "", "1", "2"]),
            ("trial_error", vec!["", "E1", "x", "", "E2"]),
        ],
    )
}

#[test]
fn trial_aggregate_counts_distinct_trials_and_keeps_last_error() {
    let aggregates = aggregate_trials(&trial_table(), &FieldNames::default()).expect("aggregate");
    assert_eq!(aggregates.len(), 3);

    let kent_1 = &aggregates[&NormalizedKey::new("kent", "1")];
    assert_eq!(kent_1.row_count, 3);
    assert_eq!(kent_1.trial_count(), 2);
    assert_eq!(kent_1.error_code, "E2");
    assert_eq!(kent_1.last_row, 4);

    let kent_01 = &aggregates[&NormalizedKey::new("kent", "01")];
    assert_eq!(kent_01.trial_count(), 0);
    assert_eq!(kent_01.error_code, "x");
}

#[test]
fn participant_aggregate_keeps_first_row_fields() {
    let table = make_table(
        SourceKind::Participant,
        &[
            ("lab", vec!["oxon", "oxford", "uva"]),
            ("subject", vec!["subj_3", "3", "009"]),
            ("age", vec!["21", "22", "30"]),
            ("notes", vec!["first", "second", ""]),
        ],
    );
    let aggregates =
        aggregate_participants(&table, &FieldNames::default()).expect("aggregate");
    let oxford = &aggregates[&NormalizedKey::new("oxford", "3")];
    assert_eq!(oxford.row_count, 2);
    assert_eq!(oxford.age, "21");
    assert_eq!(oxford.notes, "first");
    assert_eq!(oxford.session_error, "");
    assert_eq!(oxford.first_row, 0);
    assert_eq!(aggregates[&NormalizedKey::new("virginia", "9")].age, "30");
}

#[test]
fn wrong_source_kind_is_rejected() {
    let err = aggregate_participants(&trial_table(), &FieldNames::default())
        .expect_err("trial table");
    assert!(matches!(
        err,
        CoreError::WrongSourceKind {
            expected: SourceKind::Participant,
            actual: SourceKind::Trial
        }
    ));
}

#[test]
fn partitioned_matches_sequential_for_fixed_table() {
    let table = trial_table();
    let fields = FieldNames::default();
    let sequential = aggregate::<TrialAggregate>(&table, &fields);
    for partitions in 0..8 {
        assert_eq!(
            aggregate_partitioned::<TrialAggregate>(&table, &fields, partitions),
            sequential
        );
    }
}

fn rows_strategy() -> impl Strategy<Value = Vec<(u8, u8, u8, u8)>> {
    prop::collection::vec((0u8..3, 0u8..4, 0u8..3, 0u8..5), 0..40)
}

proptest! {
    #[test]
    fn partitioned_aggregation_equals_sequential(
        rows in rows_strategy(),
        partitions in 1usize..6,
    ) {
        let labs = ["kent", "uva", "oxford"];
        let lab: Vec<String> = rows.iter().map(|r| labs[r.0 as usize].to_string()).collect();
        let subject: Vec<String> = rows.iter().map(|r| format!("S{}", r.1)).collect();
        let trial: Vec<String> = rows.iter().map(|r| r.2.to_string()).collect();
        let value: Vec<String> = rows.iter().map(|r| format!("v{}", r.3)).collect();

        let build = |kind: SourceKind, field_a: &str, field_b: &str| {
            let frame = string_frame(vec![
                ("lab".to_string(), lab.clone()),
                ("subject".to_string(), subject.clone()),
                (field_a.to_string(), trial.clone()),
                (field_b.to_string(), value.clone()),
            ])
            .expect("frame");
            Normalizer::default().normalize_table(&SourceTable::new(kind, frame).expect("source"))
        };
        let fields = FieldNames::default();

        let trials = build(SourceKind::Trial, "trial", "trial_error");
        prop_assert_eq!(
            aggregate_partitioned::<TrialAggregate>(&trials, &fields, partitions),
            aggregate::<TrialAggregate>(&trials, &fields)
        );

        let participants = build(SourceKind::Participant, "notes", "age");
        prop_assert_eq!(
            aggregate_partitioned::<ParticipantAggregate>(&participants, &fields, partitions),
            aggregate::<ParticipantAggregate>(&participants, &fields)
        );
    }
}
