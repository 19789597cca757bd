//! Identifier normalization.

use std::collections::BTreeMap;
use std::time::Instant;

use polars::prelude::DataFrame;
use tracing::{debug, info};

use labmerge_ingest::column_strings;
use labmerge_model::{LAB, NormalizedKey, SUBJECT, SourceKind, canonicalize_identifier};

use crate::error::{CoreError, Result};
use crate::rules::{Field, RuleTable, default_rule_table};

/// One side of the merge as read from disk.
///
/// The frame holds string columns and always carries `lab` and `subject`.
/// It is never mutated after construction.
#[derive(Debug, Clone)]
pub struct SourceTable {
    kind: SourceKind,
    data: DataFrame,
    labs: Vec<String>,
    subjects: Vec<String>,
}

impl SourceTable {
    pub fn new(kind: SourceKind, data: DataFrame) -> Result<Self> {
        let labs = column_strings(&data, LAB).ok_or_else(|| CoreError::MissingColumn {
            kind,
            column: LAB.to_string(),
        })?;
        let subjects = column_strings(&data, SUBJECT).ok_or_else(|| CoreError::MissingColumn {
            kind,
            column: SUBJECT.to_string(),
        })?;
        Ok(Self {
            kind,
            data,
            labs,
            subjects,
        })
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn data(&self) -> &DataFrame {
        &self.data
    }

    pub fn height(&self) -> usize {
        self.data.height()
    }

    /// Raw (lab, subject) of every row, in input order.
    pub fn raw_keys(&self) -> impl Iterator<Item = (&str, &str)> {
        self.labs
            .iter()
            .map(String::as_str)
            .zip(self.subjects.iter().map(String::as_str))
    }

    /// Column values as strings; `None` when the column is absent.
    pub fn column_values(&self, name: &str) -> Option<Vec<String>> {
        column_strings(&self.data, name)
    }
}

/// A source table paired with the normalized key of every row.
#[derive(Debug, Clone)]
pub struct NormalizedTable {
    pub source: SourceTable,
    /// One key per row, in input order.
    pub keys: Vec<NormalizedKey>,
    /// How many rows each rule rewrote.
    pub rule_hits: BTreeMap<String, usize>,
}

impl NormalizedTable {
    pub fn kind(&self) -> SourceKind {
        self.source.kind()
    }

    pub fn height(&self) -> usize {
        self.keys.len()
    }

    /// Number of distinct keys.
    pub fn distinct_keys(&self) -> usize {
        let mut keys: Vec<&NormalizedKey> = self.keys.iter().collect();
        keys.sort_unstable();
        keys.dedup();
        keys.len()
    }
}

/// Applies a [`RuleTable`] followed by the generic canonicalization pass.
#[derive(Debug, Clone)]
pub struct Normalizer {
    rules: RuleTable,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(default_rule_table())
    }
}

impl Normalizer {
    pub fn new(rules: RuleTable) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Normalize one raw identifier pair.
    pub fn normalize(&self, kind: SourceKind, raw_lab: &str, raw_subject: &str) -> NormalizedKey {
        self.normalize_with(kind, raw_lab, raw_subject, |_| {})
    }

    /// Like [`Normalizer::normalize`], reporting the id of every rule that
    /// changed a value.
    pub fn normalize_with<F>(
        &self,
        kind: SourceKind,
        raw_lab: &str,
        raw_subject: &str,
        mut on_hit: F,
    ) -> NormalizedKey
    where
        F: FnMut(&str),
    {
        let raw_lab_lower = raw_lab.to_lowercase();
        let mut lab = raw_lab_lower.clone();
        let mut subject = raw_subject.to_lowercase();

        for rule in self.rules.iter() {
            if !rule.applies_to(kind, &raw_lab_lower) {
                continue;
            }
            let current = match rule.field() {
                Field::Lab => &mut lab,
                Field::Subject => &mut subject,
            };
            if let Some(rewritten) = rule.rewrite(current)
                && rewritten != *current
            {
                *current = rewritten;
                on_hit(rule.id());
            }
        }

        NormalizedKey::new(
            canonicalize_identifier(&lab),
            canonicalize_identifier(&subject),
        )
    }

    /// Normalize every row of a source table, keeping row order.
    pub fn normalize_table(&self, source: &SourceTable) -> NormalizedTable {
        let start = Instant::now();
        let kind = source.kind();
        let mut rule_hits: BTreeMap<String, usize> = BTreeMap::new();
        let keys: Vec<NormalizedKey> = source
            .raw_keys()
            .map(|(lab, subject)| {
                self.normalize_with(kind, lab, subject, |id| {
                    *rule_hits.entry(id.to_string()).or_insert(0) += 1;
                })
            })
            .collect();

        for (rule, hits) in &rule_hits {
            debug!(source = %kind, rule = %rule, hits, "rule applied");
        }
        let degenerate = keys.iter().filter(|key| key.is_degenerate()).count();
        let table = NormalizedTable {
            source: source.clone(),
            keys,
            rule_hits,
        };
        info!(
            source = %kind,
            row_count = table.height(),
            distinct_keys = table.distinct_keys(),
            degenerate_keys = degenerate,
            duration_ms = start.elapsed().as_millis(),
            "normalization complete"
        );
        table
    }
}
