pub mod discrepancy;
pub mod error;
pub mod fields;
pub mod key;
pub mod ledger;
pub mod report;
pub mod source;

pub use discrepancy::{Discrepancy, LabConcordance};
pub use error::{ModelError, Result};
pub use fields::{FieldNames, LAB, ORIGIN_FILE, SUBJECT};
pub use key::{NormalizedKey, canonicalize_identifier};
pub use ledger::{ExceptionEntry, ExceptionLedger};
pub use report::{
    DiscrepancyCounts, InputCounts, MERGE_REPORT_SCHEMA, MERGE_REPORT_SCHEMA_VERSION, MergeReport,
    VerificationStatus,
};
pub use source::{SourceKind, SourceScope};
