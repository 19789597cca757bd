//! Tests for reading and stacking source files.

use std::fs;
use std::path::{Path, PathBuf};

use labmerge_ingest::{
    ColumnMap, IngestError, column_strings, read_csv_table, read_source_frame, resolve_inputs,
};
use labmerge_model::FieldNames;

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write file");
    path
}

#[test]
fn reads_semicolon_file_with_bom_and_blank_rows() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = write(
        dir.path(),
        "kent.csv",
        "\u{feff}Lab ; Subject;Trial\n\nkent;K_01;1\nkent;K_02\n",
    );
    let table = read_csv_table(&path).expect("read csv");
    assert_eq!(table.headers, vec!["Lab", "Subject", "Trial"]);
    assert_eq!(table.rows.len(), 2);
    assert_eq!(table.rows[0], vec!["kent", "K_01", "1"]);
    assert_eq!(table.rows[1], vec!["kent", "K_02", ""]);
}

#[test]
fn stacks_files_with_union_of_columns() {
    let dir = tempfile::tempdir().expect("temp dir");
    let first = write(dir.path(), "a.csv", "Site,PID,trial\nkent,1,1\nkent,1,2\n");
    let second = write(dir.path(), "b.tsv", "lab\tsubject\tage\nuva\t7\t21\n");
    let map = ColumnMap::with_defaults(&FieldNames::default());

    let frame = read_source_frame(&[first.clone(), second.clone()], &map).expect("frame");
    assert_eq!(frame.height(), 3);
    let names: Vec<String> = frame
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    assert_eq!(names, vec!["lab", "subject", "trial", "age", "origin_file"]);

    assert_eq!(
        column_strings(&frame, "lab").expect("lab"),
        vec!["kent", "kent", "uva"]
    );
    assert_eq!(
        column_strings(&frame, "age").expect("age"),
        vec!["", "", "21"]
    );
    let origins = column_strings(&frame, "origin_file").expect("origin");
    assert_eq!(origins[0], first.display().to_string());
    assert_eq!(origins[2], second.display().to_string());
}

#[test]
fn missing_subject_column_is_rejected() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = write(dir.path(), "bad.csv", "lab,rt\nkent,300\n");
    let map = ColumnMap::with_defaults(&FieldNames::default());
    let error = read_source_frame(&[path], &map).expect_err("missing subject");
    assert!(matches!(error, IngestError::MissingColumn { ref column, .. } if column == "subject"));
}

#[test]
fn two_aliases_for_one_column_are_ambiguous() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = write(dir.path(), "dup.csv", "lab,site,subject\nkent,kent,1\n");
    let map = ColumnMap::with_defaults(&FieldNames::default());
    let error = read_source_frame(&[path], &map).expect_err("ambiguous");
    assert!(matches!(error, IngestError::AmbiguousColumn { .. }));
}

#[test]
fn resolves_directories_in_filename_order() {
    let dir = tempfile::tempdir().expect("temp dir");
    write(dir.path(), "b.csv", "lab,subject\n");
    write(dir.path(), "a.csv", "lab,subject\n");
    write(dir.path(), "notes.md", "ignore me");
    let explicit = write(dir.path(), "z.dat", "lab,subject\n");

    let files = resolve_inputs(&[dir.path().to_path_buf()]).expect("resolve");
    let names: Vec<String> = files
        .iter()
        .map(|path| path.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["a.csv", "b.csv", "z.dat"]);

    let files = resolve_inputs(&[explicit.clone()]).expect("resolve file");
    assert_eq!(files, vec![explicit]);
}

#[test]
fn missing_input_is_reported() {
    let dir = tempfile::tempdir().expect("temp dir");
    let error = resolve_inputs(&[dir.path().join("nope.csv")]).expect_err("missing");
    assert!(matches!(error, IngestError::InputNotFound { .. }));

    let empty = tempfile::tempdir().expect("temp dir");
    let error = resolve_inputs(&[empty.path().to_path_buf()]).expect_err("empty");
    assert!(matches!(error, IngestError::NoSourceFiles { .. }));
}
