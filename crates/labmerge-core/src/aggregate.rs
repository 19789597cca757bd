//! Per-key summaries of each normalized source.
//!
//! Every aggregate remembers the input row index that decided its first/last
//! fields, so aggregates built over separate chunks of a table can be merged
//! back into exactly the sequential result.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;
use std::time::Instant;

use tracing::{debug, info};

use labmerge_model::{FieldNames, NormalizedKey, SourceKind};

use crate::error::{CoreError, Result};
use crate::normalize::NormalizedTable;

pub type TrialAggregates = BTreeMap<NormalizedKey, TrialAggregate>;
pub type ParticipantAggregates = BTreeMap<NormalizedKey, ParticipantAggregate>;

/// Non-key field values of a table, one entry per row.
///
/// A field missing from the source reads as empty for every row.
#[derive(Debug, Clone, Default)]
pub struct FieldColumns {
    trial: Vec<String>,
    trial_error: Vec<String>,
    age: Vec<String>,
    notes: Vec<String>,
    session_error: Vec<String>,
}

impl FieldColumns {
    pub fn from_table(table: &NormalizedTable, fields: &FieldNames) -> Self {
        let read = |name: &str| table.source.column_values(name).unwrap_or_default();
        Self {
            trial: read(&fields.trial),
            trial_error: read(&fields.trial_error),
            age: read(&fields.age),
            notes: read(&fields.notes),
            session_error: read(&fields.session_error),
        }
    }

    fn cell(values: &[String], row: usize) -> &str {
        values.get(row).map(|value| value.trim()).unwrap_or("")
    }

    pub fn trial(&self, row: usize) -> &str {
        Self::cell(&self.trial, row)
    }

    pub fn trial_error(&self, row: usize) -> &str {
        Self::cell(&self.trial_error, row)
    }

    pub fn age(&self, row: usize) -> &str {
        Self::cell(&self.age, row)
    }

    pub fn notes(&self, row: usize) -> &str {
        Self::cell(&self.notes, row)
    }

    pub fn session_error(&self, row: usize) -> &str {
        Self::cell(&self.session_error, row)
    }
}

/// A per-key summary that can be built row by row and merged across chunks.
///
/// `merge` must be commutative with respect to the row-index ordering key:
/// merging two partial aggregates gives the same value regardless of which
/// one is `self`.
pub trait KeyAggregate: Clone + Send {
    fn start(row: usize, columns: &FieldColumns) -> Self;
    fn absorb(&mut self, row: usize, columns: &FieldColumns);
    fn merge(&mut self, other: Self);
    fn row_count(&self) -> usize;
}

/// Trial-side summary of one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialAggregate {
    /// Distinct non-empty trial values.
    pub trials: BTreeSet<String>,
    pub row_count: usize,
    /// Error code of the last row in input order.
    pub error_code: String,
    /// Input index of the row `error_code` came from.
    pub last_row: usize,
}

impl TrialAggregate {
    pub fn trial_count(&self) -> usize {
        self.trials.len()
    }
}

impl KeyAggregate for TrialAggregate {
    fn start(row: usize, columns: &FieldColumns) -> Self {
        let mut trials = BTreeSet::new();
        let trial = columns.trial(row);
        if !trial.is_empty() {
            trials.insert(trial.to_string());
        }
        Self {
            trials,
            row_count: 1,
            error_code: columns.trial_error(row).to_string(),
            last_row: row,
        }
    }

    fn absorb(&mut self, row: usize, columns: &FieldColumns) {
        let trial = columns.trial(row);
        if !trial.is_empty() {
            self.trials.insert(trial.to_string());
        }
        self.row_count += 1;
        if row >= self.last_row {
            self.error_code = columns.trial_error(row).to_string();
            self.last_row = row;
        }
    }

    fn merge(&mut self, other: Self) {
        self.trials.extend(other.trials);
        self.row_count += other.row_count;
        if other.last_row > self.last_row {
            self.error_code = other.error_code;
            self.last_row = other.last_row;
        }
    }

    fn row_count(&self) -> usize {
        self.row_count
    }
}

/// Participant-side summary of one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantAggregate {
    pub row_count: usize,
    pub age: String,
    pub notes: String,
    pub session_error: String,
    /// Input index of the row the fields came from.
    pub first_row: usize,
}

impl ParticipantAggregate {
    fn take_fields(&mut self, row: usize, columns: &FieldColumns) {
        self.age = columns.age(row).to_string();
        self.notes = columns.notes(row).to_string();
        self.session_error = columns.session_error(row).to_string();
        self.first_row = row;
    }
}

impl KeyAggregate for ParticipantAggregate {
    fn start(row: usize, columns: &FieldColumns) -> Self {
        let mut aggregate = Self {
            row_count: 1,
            age: String::new(),
            notes: String::new(),
            session_error: String::new(),
            first_row: row,
        };
        aggregate.take_fields(row, columns);
        aggregate
    }

    fn absorb(&mut self, row: usize, columns: &FieldColumns) {
        self.row_count += 1;
        if row < self.first_row {
            self.take_fields(row, columns);
        }
    }

    fn merge(&mut self, other: Self) {
        self.row_count += other.row_count;
        if other.first_row < self.first_row {
            self.age = other.age;
            self.notes = other.notes;
            self.session_error = other.session_error;
            self.first_row = other.first_row;
        }
    }

    fn row_count(&self) -> usize {
        self.row_count
    }
}

/// Aggregate the rows in `range`.
pub fn aggregate_rows<A: KeyAggregate>(
    keys: &[NormalizedKey],
    range: Range<usize>,
    columns: &FieldColumns,
) -> BTreeMap<NormalizedKey, A> {
    let mut groups: BTreeMap<NormalizedKey, A> = BTreeMap::new();
    for row in range {
        let Some(key) = keys.get(row) else {
            break;
        };
        match groups.get_mut(key) {
            Some(aggregate) => aggregate.absorb(row, columns),
            None => {
                groups.insert(key.clone(), A::start(row, columns));
            }
        }
    }
    groups
}

/// Fold `other` into `into`, key by key.
pub fn merge_aggregates<A: KeyAggregate>(
    into: &mut BTreeMap<NormalizedKey, A>,
    other: BTreeMap<NormalizedKey, A>,
) {
    for (key, aggregate) in other {
        match into.get_mut(&key) {
            Some(existing) => existing.merge(aggregate),
            None => {
                into.insert(key, aggregate);
            }
        }
    }
}

/// Group every row of `table` by normalized key.
pub fn aggregate<A: KeyAggregate>(
    table: &NormalizedTable,
    fields: &FieldNames,
) -> BTreeMap<NormalizedKey, A> {
    let columns = FieldColumns::from_table(table, fields);
    aggregate_rows(&table.keys, 0..table.height(), &columns)
}

/// Aggregate contiguous chunks on separate threads, then merge.
///
/// The result equals [`aggregate`] for any `partitions`.
pub fn aggregate_partitioned<A: KeyAggregate>(
    table: &NormalizedTable,
    fields: &FieldNames,
    partitions: usize,
) -> BTreeMap<NormalizedKey, A> {
    let columns = FieldColumns::from_table(table, fields);
    let height = table.height();
    let partitions = partitions.clamp(1, height.max(1));
    if partitions == 1 {
        return aggregate_rows(&table.keys, 0..height, &columns);
    }
    let chunk = height.div_ceil(partitions);
    let keys = table.keys.as_slice();
    let columns = &columns;

    let partials: Vec<BTreeMap<NormalizedKey, A>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..height)
            .step_by(chunk)
            .map(|start| {
                let end = (start + chunk).min(height);
                scope.spawn(move || aggregate_rows::<A>(keys, start..end, columns))
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
            })
            .collect()
    });
    debug!(partitions = partials.len(), chunk_rows = chunk, "partial aggregates built");

    let mut merged = BTreeMap::new();
    for partial in partials {
        merge_aggregates(&mut merged, partial);
    }
    merged
}

fn expect_kind(table: &NormalizedTable, expected: SourceKind) -> Result<()> {
    if table.kind() != expected {
        return Err(CoreError::WrongSourceKind {
            expected,
            actual: table.kind(),
        });
    }
    Ok(())
}

/// Trial-side pre-merge aggregates.
pub fn aggregate_trials(table: &NormalizedTable, fields: &FieldNames) -> Result<TrialAggregates> {
    expect_kind(table, SourceKind::Trial)?;
    let start = Instant::now();
    let aggregates: TrialAggregates = aggregate(table, fields);
    info!(
        source = %SourceKind::Trial,
        row_count = table.height(),
        key_count = aggregates.len(),
        duration_ms = start.elapsed().as_millis(),
        "aggregation complete"
    );
    Ok(aggregates)
}

/// Participant-side pre-merge aggregates.
pub fn aggregate_participants(
    table: &NormalizedTable,
    fields: &FieldNames,
) -> Result<ParticipantAggregates> {
    expect_kind(table, SourceKind::Participant)?;
    let start = Instant::now();
    let aggregates: ParticipantAggregates = aggregate(table, fields);
    let duplicated = aggregates.values().filter(|agg| agg.row_count > 1).count();
    info!(
        source = %SourceKind::Participant,
        row_count = table.height(),
        key_count = aggregates.len(),
        duplicated_keys = duplicated,
        duration_ms = start.elapsed().as_millis(),
        "aggregation complete"
    );
    Ok(aggregates)
}
