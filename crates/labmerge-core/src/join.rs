//! Natural inner join of the two normalized sources.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use polars::prelude::DataFrame;
use tracing::info;

use labmerge_ingest::string_frame;
use labmerge_model::{LAB, NormalizedKey, SUBJECT};

use crate::error::Result;
use crate::normalize::NormalizedTable;

/// Suffix for participant columns whose name is already used by the trial side.
pub const PARTICIPANT_SUFFIX: &str = "_participant";

/// The joined table plus, for every row, the key and source rows it came from.
#[derive(Debug, Clone)]
pub struct MergedTable {
    pub data: DataFrame,
    pub keys: Vec<NormalizedKey>,
    pub trial_rows: Vec<usize>,
    pub participant_rows: Vec<usize>,
    /// Merged column names holding trial-side values.
    pub trial_columns: BTreeSet<String>,
}

impl MergedTable {
    pub fn height(&self) -> usize {
        self.keys.len()
    }

    /// Whether the merged column `name` was taken from the trial source.
    pub fn is_trial_column(&self, name: &str) -> bool {
        self.trial_columns.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Join strategy used by the merge pipeline.
pub trait JoinExecutor {
    fn name(&self) -> &str;

    fn join(&self, trial: &NormalizedTable, participant: &NormalizedTable) -> Result<MergedTable>;
}

/// Inner join on the normalized key.
///
/// Rows follow trial input order; a trial row matching several participant
/// rows is repeated once per match, in participant input order.
#[derive(Debug, Clone, Copy, Default)]
pub struct NaturalJoin;

impl JoinExecutor for NaturalJoin {
    fn name(&self) -> &str {
        "natural"
    }

    fn join(&self, trial: &NormalizedTable, participant: &NormalizedTable) -> Result<MergedTable> {
        let start = Instant::now();
        let mut participant_index: BTreeMap<&NormalizedKey, Vec<usize>> = BTreeMap::new();
        for (row, key) in participant.keys.iter().enumerate() {
            participant_index.entry(key).or_default().push(row);
        }

        let mut pairs: Vec<(usize, usize)> = Vec::with_capacity(trial.height());
        for (trial_row, key) in trial.keys.iter().enumerate() {
            if let Some(rows) = participant_index.get(key) {
                pairs.extend(rows.iter().map(|participant_row| (trial_row, *participant_row)));
            }
        }

        let merged = assemble(trial, participant, &pairs)?;
        info!(
            join = self.name(),
            trial_rows = trial.height(),
            participant_rows = participant.height(),
            merged_rows = merged.height(),
            duration_ms = start.elapsed().as_millis(),
            "join complete"
        );
        Ok(merged)
    }
}

fn value_columns(table: &NormalizedTable) -> Vec<(String, Vec<String>)> {
    table
        .source
        .data()
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .filter(|name| name != LAB && name != SUBJECT)
        .map(|name| {
            let values = table.source.column_values(&name).unwrap_or_default();
            (name, values)
        })
        .collect()
}

fn pick(values: &[String], rows: impl Iterator<Item = usize>) -> Vec<String> {
    rows.map(|row| values.get(row).cloned().unwrap_or_default())
        .collect()
}

/// Build the merged frame for the given (trial row, participant row) pairs.
///
/// Columns are `lab`, `subject` (normalized), then the trial columns, then the
/// participant columns, renamed with [`PARTICIPANT_SUFFIX`] on collision.
pub fn assemble(
    trial: &NormalizedTable,
    participant: &NormalizedTable,
    pairs: &[(usize, usize)],
) -> Result<MergedTable> {
    let keys: Vec<NormalizedKey> = pairs
        .iter()
        .map(|(trial_row, _)| trial.keys.get(*trial_row).cloned().unwrap_or_default())
        .collect();
    let trial_rows: Vec<usize> = pairs.iter().map(|(row, _)| *row).collect();
    let participant_rows: Vec<usize> = pairs.iter().map(|(_, row)| *row).collect();

    let mut used: BTreeSet<String> = [LAB.to_string(), SUBJECT.to_string()].into();
    let mut columns: Vec<(String, Vec<String>)> = vec![
        (LAB.to_string(), keys.iter().map(|key| key.lab.clone()).collect()),
        (
            SUBJECT.to_string(),
            keys.iter().map(|key| key.subject.clone()).collect(),
        ),
    ];

    let mut trial_columns = BTreeSet::new();
    for (name, values) in value_columns(trial) {
        used.insert(name.clone());
        trial_columns.insert(name.clone());
        columns.push((name, pick(&values, trial_rows.iter().copied())));
    }
    for (name, values) in value_columns(participant) {
        let mut output = name;
        while used.contains(&output) {
            output.push_str(PARTICIPANT_SUFFIX);
        }
        used.insert(output.clone());
        columns.push((output, pick(&values, participant_rows.iter().copied())));
    }

    Ok(MergedTable {
        data: string_frame(columns)?,
        keys,
        trial_rows,
        participant_rows,
        trial_columns,
    })
}
