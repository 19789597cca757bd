//! Mapping of site-specific column labels onto canonical field names.

use std::collections::BTreeMap;
use std::path::Path;

use labmerge_model::{FieldNames, LAB, ORIGIN_FILE, SUBJECT, canonicalize_identifier};

use crate::csv_table::CsvTable;
use crate::error::{IngestError, Result};

/// Case- and punctuation-insensitive alias table.
///
/// Headers are compared after canonicalization, so `"Lab ID"`, `"lab_id"`
/// and `"LAB-ID"` all hit the same alias. Headers with no alias keep their
/// original spelling.
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    /// canonicalized alias -> canonical column name
    aliases: BTreeMap<String, String>,
}

impl ColumnMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Alias table covering the key columns and the aggregated fields.
    pub fn with_defaults(fields: &FieldNames) -> Self {
        let mut map = Self::new();
        map.add_aliases(LAB, ["lab", "site", "lab_id", "site_id", "lab_name"]);
        map.add_aliases(
            SUBJECT,
            [
                "subject",
                "participant",
                "participant_id",
                "subject_id",
                "pid",
                "id",
            ],
        );
        map.add_aliases(&fields.trial, ["trial", "trial_number", "trialnum", "trial_no"]);
        map.add_aliases(&fields.trial_error, ["trial_error", "error", "error_code"]);
        map.add_aliases(&fields.age, ["age", "age_years"]);
        map.add_aliases(&fields.notes, ["notes", "note", "comments"]);
        map.add_aliases(&fields.session_error, ["session_error", "session_error_code"]);
        map
    }

    /// Register aliases for a canonical column. The canonical name itself is
    /// always an alias of itself. Later registrations win.
    pub fn add_aliases<I, S>(&mut self, canonical: &str, aliases: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.aliases
            .insert(canonicalize_identifier(canonical), canonical.to_string());
        for alias in aliases {
            let key = canonicalize_identifier(alias.as_ref());
            if !key.is_empty() {
                self.aliases.insert(key, canonical.to_string());
            }
        }
    }

    /// Canonical name for a raw header, if it is a known alias.
    pub fn resolve(&self, header: &str) -> Option<&str> {
        self.aliases
            .get(&canonicalize_identifier(header))
            .map(String::as_str)
    }

    /// Rename the headers of a table in place.
    pub fn apply(&self, table: &mut CsvTable, path: &Path) -> Result<()> {
        let mut claimed: BTreeMap<String, String> = BTreeMap::new();
        let mut renamed = Vec::with_capacity(table.headers.len());
        for header in &table.headers {
            let target = self
                .resolve(header)
                .map(str::to_string)
                .unwrap_or_else(|| header.clone());
            if target == ORIGIN_FILE {
                // Provenance is owned by the reader.
                renamed.push(format!("{header}_source"));
                continue;
            }
            if let Some(first) = claimed.insert(target.clone(), header.clone()) {
                return Err(IngestError::AmbiguousColumn {
                    canonical: target,
                    first,
                    second: header.clone(),
                    path: path.to_path_buf(),
                });
            }
            renamed.push(target);
        }
        table.headers = renamed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_aliases_ignoring_case_and_punctuation() {
        let map = ColumnMap::with_defaults(&FieldNames::default());
        assert_eq!(map.resolve("Lab ID"), Some(LAB));
        assert_eq!(map.resolve("SITE"), Some(LAB));
        assert_eq!(map.resolve("Participant-ID"), Some(SUBJECT));
        assert_eq!(map.resolve("TrialNum"), Some("trial"));
        assert_eq!(map.resolve("reaction_time"), None);
    }
}
