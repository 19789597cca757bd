use labmerge_ingest::IngestError;
use labmerge_model::SourceKind;
use thiserror::Error;

use crate::rules::RuleTableError;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{kind} source is missing required column '{column}'")]
    MissingColumn { kind: SourceKind, column: String },

    #[error("expected a {expected} table, got {actual}")]
    WrongSourceKind {
        expected: SourceKind,
        actual: SourceKind,
    },

    #[error(transparent)]
    RuleTable(#[from] RuleTableError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("DataFrame operation failed: {0}")]
    DataFrame(#[from] polars::error::PolarsError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
