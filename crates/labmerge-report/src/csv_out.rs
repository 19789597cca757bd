use std::path::{Path, PathBuf};

use csv::{Terminator, Writer, WriterBuilder};
use serde::Serialize;

use labmerge_core::{MergedTable, ParticipantAggregates, TrialAggregates};
use labmerge_ingest::column_strings;
use labmerge_model::{Discrepancy, LabConcordance};
use labmerge_validate::ValidationOutcome;

use crate::error::{ReportError, Result};
use crate::write_bytes;

pub const MERGED_FILE: &str = "merged.csv";
pub const UNCONFIRMED_FILE: &str = "unconfirmed_unmatched.csv";
pub const LAB_CONCORDANCE_FILE: &str = "lab_concordance.csv";

const UNCONFIRMED_HEADER: [&str; 12] = [
    "lab",
    "subject",
    "in_trial",
    "in_participant",
    "missing_from",
    "trial_rows",
    "trial_count",
    "trial_error",
    "participant_rows",
    "age",
    "notes",
    "session_error",
];

const LAB_CONCORDANCE_HEADER: [&str; 7] = [
    "lab",
    "trial_participants",
    "participant_participants",
    "trial_only",
    "participant_only",
    "confirmed",
    "concordant",
];

fn writer() -> Writer<Vec<u8>> {
    WriterBuilder::new()
        .has_headers(false)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new())
}

fn finish(name: &'static str, writer: Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer.into_inner().map_err(|err| ReportError::Csv {
        name,
        source: csv::Error::from(err.into_error()),
    })
}

fn csv_err(name: &'static str) -> impl Fn(csv::Error) -> ReportError {
    move |source| ReportError::Csv { name, source }
}

/// Render the merged table, columns in frame order.
pub fn render_merged(merged: &MergedTable) -> Result<Vec<u8>> {
    let names: Vec<String> = merged
        .data
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let columns: Vec<Vec<String>> = names
        .iter()
        .map(|name| column_strings(&merged.data, name).unwrap_or_default())
        .collect();

    let mut out = writer();
    out.write_record(&names).map_err(csv_err(MERGED_FILE))?;
    for row in 0..merged.data.height() {
        let record = columns
            .iter()
            .map(|values| values.get(row).map(String::as_str).unwrap_or(""));
        out.write_record(record).map_err(csv_err(MERGED_FILE))?;
    }
    finish(MERGED_FILE, out)
}

/// One row of `unconfirmed_unmatched.csv`.
///
/// Fields of the side the key is missing from are empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnconfirmedRow {
    pub lab: String,
    pub subject: String,
    pub in_trial: bool,
    pub in_participant: bool,
    pub missing_from: String,
    pub trial_rows: Option<usize>,
    pub trial_count: Option<usize>,
    pub trial_error: Option<String>,
    pub participant_rows: Option<usize>,
    pub age: Option<String>,
    pub notes: Option<String>,
    pub session_error: Option<String>,
}

impl UnconfirmedRow {
    fn new(
        item: &Discrepancy,
        trial: &TrialAggregates,
        participant: &ParticipantAggregates,
    ) -> Self {
        let trial = trial.get(&item.key);
        let participant = participant.get(&item.key);
        Self {
            lab: item.key.lab.clone(),
            subject: item.key.subject.clone(),
            in_trial: trial.is_some(),
            in_participant: participant.is_some(),
            missing_from: item.missing_from.to_string(),
            trial_rows: trial.map(|agg| agg.row_count),
            trial_count: trial.map(|agg| agg.trial_count()),
            trial_error: trial.map(|agg| agg.error_code.clone()),
            participant_rows: participant.map(|agg| agg.row_count),
            age: participant.map(|agg| agg.age.clone()),
            notes: participant.map(|agg| agg.notes.clone()),
            session_error: participant.map(|agg| agg.session_error.clone()),
        }
    }
}

/// Rows for every unconfirmed discrepancy, in key order.
pub fn unconfirmed_rows(
    outcome: &ValidationOutcome,
    trial: &TrialAggregates,
    participant: &ParticipantAggregates,
) -> Vec<UnconfirmedRow> {
    outcome
        .unconfirmed()
        .map(|item| UnconfirmedRow::new(item, trial, participant))
        .collect()
}

pub fn render_unconfirmed(rows: &[UnconfirmedRow]) -> Result<Vec<u8>> {
    let mut out = writer();
    out.write_record(UNCONFIRMED_HEADER)
        .map_err(csv_err(UNCONFIRMED_FILE))?;
    for row in rows {
        out.serialize(row).map_err(csv_err(UNCONFIRMED_FILE))?;
    }
    finish(UNCONFIRMED_FILE, out)
}

pub fn render_lab_concordance(rows: &[LabConcordance]) -> Result<Vec<u8>> {
    let mut out = writer();
    out.write_record(LAB_CONCORDANCE_HEADER)
        .map_err(csv_err(LAB_CONCORDANCE_FILE))?;
    for row in rows {
        out.serialize(row).map_err(csv_err(LAB_CONCORDANCE_FILE))?;
    }
    finish(LAB_CONCORDANCE_FILE, out)
}

/// Write `merged.csv`; returns the path and the bytes written.
pub fn write_merged(dir: &Path, merged: &MergedTable) -> Result<(PathBuf, Vec<u8>)> {
    let bytes = render_merged(merged)?;
    let path = write_bytes(dir, MERGED_FILE, &bytes)?;
    Ok((path, bytes))
}

pub fn write_unconfirmed(dir: &Path, rows: &[UnconfirmedRow]) -> Result<PathBuf> {
    write_bytes(dir, UNCONFIRMED_FILE, &render_unconfirmed(rows)?)
}

pub fn write_lab_concordance(dir: &Path, rows: &[LabConcordance]) -> Result<PathBuf> {
    write_bytes(dir, LAB_CONCORDANCE_FILE, &render_lab_concordance(rows)?)
}
