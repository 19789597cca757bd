use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid source kind: {0}")]
    InvalidSourceKind(String),
    #[error("duplicate exception ledger entry for {lab}/{subject}")]
    DuplicateLedgerEntry { lab: String, subject: String },
}

pub type Result<T> = std::result::Result<T, ModelError>;
