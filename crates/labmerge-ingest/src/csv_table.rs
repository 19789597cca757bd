//! Delimited text reading with per-file delimiter detection.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use csv::ReaderBuilder;

use crate::error::{IngestError, Result};

/// Delimiters sites are known to use, in tie-break order.
const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// A raw table: header row plus string cells, padded to the header width.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }
}

fn normalize_header(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('\u{feff}');
    let mut parts = trimmed.split_whitespace();
    let mut normalized = String::new();
    if let Some(first) = parts.next() {
        normalized.push_str(first);
        for part in parts {
            normalized.push(' ');
            normalized.push_str(part);
        }
    }
    normalized
}

fn normalize_cell(raw: &str) -> String {
    raw.trim().trim_matches('\u{feff}').to_string()
}

/// Count delimiter candidates outside quoted sections of a header line.
fn count_unquoted(line: &str, delimiter: u8) -> usize {
    let mut in_quotes = false;
    let mut count = 0usize;
    for byte in line.bytes() {
        if byte == b'"' {
            in_quotes = !in_quotes;
        } else if byte == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}

/// Pick the delimiter that splits the first non-empty line into the most
/// fields. Falls back to a comma for single-column files.
pub fn detect_delimiter(first_line: &str) -> u8 {
    let mut best = b',';
    let mut best_count = 0usize;
    for candidate in CANDIDATE_DELIMITERS {
        let count = count_unquoted(first_line, candidate);
        if count > best_count {
            best = candidate;
            best_count = count;
        }
    }
    best
}

pub(crate) fn sniff_delimiter(path: &Path) -> Result<u8> {
    let file = File::open(path).map_err(|source| IngestError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .map_err(|source| IngestError::FileRead {
                path: path.to_path_buf(),
                source,
            })?;
        if read == 0 {
            return Ok(b',');
        }
        let line = String::from_utf8_lossy(&buf);
        if !line.trim().trim_matches('\u{feff}').is_empty() {
            return Ok(detect_delimiter(&line));
        }
    }
}

/// Read a delimited file. The first non-empty row is the header; fully empty
/// rows are skipped and short rows are padded with empty cells. Invalid UTF-8
/// is replaced rather than rejected.
pub fn read_csv_table(path: &Path) -> Result<CsvTable> {
    let delimiter = sniff_delimiter(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_path(path)
        .map_err(|source| IngestError::CsvParse {
            path: path.to_path_buf(),
            source,
        })?;

    let mut headers: Option<Vec<String>> = None;
    let mut rows = Vec::new();
    for record in reader.byte_records() {
        let record = record.map_err(|source| IngestError::CsvParse {
            path: path.to_path_buf(),
            source,
        })?;
        let cells: Vec<String> = record
            .iter()
            .map(|field| normalize_cell(&String::from_utf8_lossy(field)))
            .collect();
        if cells.iter().all(|value| value.is_empty()) {
            continue;
        }
        match &headers {
            None => {
                headers = Some(cells.iter().map(|cell| normalize_header(cell)).collect());
            }
            Some(header_row) => {
                let mut row = Vec::with_capacity(header_row.len());
                for idx in 0..header_row.len() {
                    row.push(cells.get(idx).cloned().unwrap_or_default());
                }
                rows.push(row);
            }
        }
    }

    Ok(CsvTable {
        headers: headers.unwrap_or_default(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_common_delimiters() {
        assert_eq!(detect_delimiter("lab,subject,trial"), b',');
        assert_eq!(detect_delimiter("lab;subject;trial"), b';');
        assert_eq!(detect_delimiter("lab\tsubject\ttrial"), b'\t');
        assert_eq!(detect_delimiter("lab|subject|trial"), b'|');
        assert_eq!(detect_delimiter("subject"), b',');
    }

    #[test]
    fn ignores_delimiters_inside_quotes() {
        assert_eq!(detect_delimiter("\"a;b;c\",\"d\",e"), b',');
    }

    #[test]
    fn header_whitespace_is_collapsed() {
        assert_eq!(normalize_header("\u{feff} Lab   ID "), "Lab ID");
    }
}
