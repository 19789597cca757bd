//! Assembly of one side of the merge into a single string frame.

use std::path::{Path, PathBuf};
use std::time::Instant;

use polars::prelude::DataFrame;
use tracing::{debug, info};

use labmerge_model::{LAB, ORIGIN_FILE, SUBJECT};

use crate::csv_table::{CsvTable, read_csv_table};
use crate::error::{IngestError, Result};
use crate::polars_utils::string_frame;
use crate::remap::ColumnMap;

/// Read and remap every file, then stack them into one frame.
///
/// Row order is file order, then row order within each file. Columns are the
/// union of all remapped headers in first-seen order, followed by
/// `origin_file`; cells a file does not provide are empty.
pub fn read_source_frame(paths: &[PathBuf], column_map: &ColumnMap) -> Result<DataFrame> {
    let start = Instant::now();
    let mut tables = Vec::with_capacity(paths.len());
    for path in paths {
        let mut table = read_csv_table(path)?;
        column_map.apply(&mut table, path)?;
        debug!(
            source_file = %path.display(),
            row_count = table.rows.len(),
            column_count = table.headers.len(),
            "read source file"
        );
        tables.push((path.clone(), table));
    }
    let frame = read_source_frame_from_tables(tables)?;
    info!(
        file_count = paths.len(),
        row_count = frame.height(),
        duration_ms = start.elapsed().as_millis(),
        "source read complete"
    );
    Ok(frame)
}

fn require_column(table: &CsvTable, column: &str, path: &Path) -> Result<()> {
    if table.column_index(column).is_none() {
        return Err(IngestError::MissingColumn {
            column: column.to_string(),
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

/// Stack already-remapped tables. Each table must carry `lab` and `subject`.
pub fn read_source_frame_from_tables(tables: Vec<(PathBuf, CsvTable)>) -> Result<DataFrame> {
    let mut headers: Vec<String> = Vec::new();
    for (path, table) in &tables {
        require_column(table, LAB, path)?;
        require_column(table, SUBJECT, path)?;
        for header in &table.headers {
            if !headers.contains(header) {
                headers.push(header.clone());
            }
        }
    }

    let total_rows: usize = tables.iter().map(|(_, table)| table.rows.len()).sum();
    let mut columns: Vec<Vec<String>> = vec![Vec::with_capacity(total_rows); headers.len()];
    let mut origins = Vec::with_capacity(total_rows);
    for (path, table) in &tables {
        let positions: Vec<Option<usize>> = headers
            .iter()
            .map(|header| table.column_index(header))
            .collect();
        let origin = path.display().to_string();
        for row in &table.rows {
            for (column, position) in columns.iter_mut().zip(&positions) {
                let value = position
                    .and_then(|idx| row.get(idx))
                    .cloned()
                    .unwrap_or_default();
                column.push(value);
            }
            origins.push(origin.clone());
        }
    }

    let mut named: Vec<(String, Vec<String>)> = headers.into_iter().zip(columns).collect();
    named.push((ORIGIN_FILE.to_string(), origins));
    string_frame(named)
}
