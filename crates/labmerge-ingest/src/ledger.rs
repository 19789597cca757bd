//! Exception ledger loading.
//!
//! The ledger is maintained by hand outside the engine. It is a table with
//! `subject`, `lab` and `Confirmed` columns, where `Confirmed == "X"` marks
//! a key that is known to exist in only one source.

use std::path::Path;

use csv::ReaderBuilder;
use tracing::info;

use labmerge_model::{ExceptionEntry, ExceptionLedger};

use crate::csv_table::sniff_delimiter;
use crate::error::{IngestError, Result};

/// Marker value of the `Confirmed` column.
pub const CONFIRMED_MARK: &str = "X";

/// CSV row structure for the ledger file.
#[derive(Debug, serde::Deserialize)]
struct LedgerCsvRow {
    #[serde(alias = "Subject", alias = "SUBJECT")]
    subject: String,
    #[serde(alias = "Lab", alias = "LAB")]
    lab: String,
    #[serde(rename = "Confirmed", alias = "confirmed", alias = "CONFIRMED", default)]
    confirmed: Option<String>,
}

fn is_confirmed(mark: Option<&str>) -> bool {
    mark.is_some_and(|value| value.trim().eq_ignore_ascii_case(CONFIRMED_MARK))
}

/// Load the exception ledger from a delimited file.
///
/// Rows with an empty lab and subject are skipped. Unknown columns are
/// ignored.
pub fn load_exception_ledger(path: &Path) -> Result<ExceptionLedger> {
    if !path.is_file() {
        return Err(IngestError::InputNotFound {
            path: path.to_path_buf(),
        });
    }
    let delimiter = sniff_delimiter(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .delimiter(delimiter)
        .from_path(path)
        .map_err(|source| IngestError::CsvParse {
            path: path.to_path_buf(),
            source,
        })?;

    let mut entries = Vec::new();
    for result in reader.deserialize::<LedgerCsvRow>() {
        let row = result.map_err(|source| IngestError::CsvParse {
            path: path.to_path_buf(),
            source,
        })?;
        if row.lab.trim().is_empty() && row.subject.trim().is_empty() {
            continue;
        }
        entries.push(ExceptionEntry {
            confirmed: is_confirmed(row.confirmed.as_deref()),
            lab: row.lab,
            subject: row.subject,
        });
    }

    let ledger = ExceptionLedger::from_entries(entries).map_err(|error| IngestError::Ledger {
        path: path.to_path_buf(),
        reason: error.to_string(),
    })?;
    info!(
        ledger_file = %path.display(),
        entry_count = ledger.len(),
        confirmed_count = ledger.confirmed_count(),
        "exception ledger loaded"
    );
    Ok(ledger)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirmation_mark_is_case_insensitive() {
        assert!(is_confirmed(Some("X")));
        assert!(is_confirmed(Some(" x ")));
        assert!(!is_confirmed(Some("")));
        assert!(!is_confirmed(Some("yes")));
        assert!(!is_confirmed(None));
    }
}
