//! Error types for source ingestion.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading sources or the ledger.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Input path does not exist.
    #[error("input not found: {path}")]
    InputNotFound { path: PathBuf },

    /// Failed to read directory entries.
    #[error("failed to read directory {path}: {source}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to open or sniff a file.
    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed CSV content.
    #[error("failed to parse {path}: {source}")]
    CsvParse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// No source files were found for one side of the merge.
    #[error("no source files found in {paths}")]
    NoSourceFiles { paths: String },

    /// A canonical column is missing after remapping.
    #[error("required column '{column}' not found in {path}")]
    MissingColumn { column: String, path: PathBuf },

    /// Two site columns map onto the same canonical name.
    #[error("columns '{first}' and '{second}' both map to '{canonical}' in {path}")]
    AmbiguousColumn {
        canonical: String,
        first: String,
        second: String,
        path: PathBuf,
    },

    /// Exception ledger content is invalid.
    #[error("invalid exception ledger {path}: {reason}")]
    Ledger { path: PathBuf, reason: String },

    /// Failed DataFrame construction.
    #[error("DataFrame operation failed: {0}")]
    DataFrame(#[from] polars::error::PolarsError),
}

pub type Result<T> = std::result::Result<T, IngestError>;
