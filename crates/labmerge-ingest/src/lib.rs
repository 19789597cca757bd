//! Reading of raw source files into canonical tables.
//!
//! Everything in this crate sits in front of the reconciliation engine: it
//! hides delimiter differences between sites, maps site column labels to the
//! canonical schema, and loads the exception ledger.

pub mod csv_table;
pub mod discovery;
pub mod error;
pub mod ledger;
pub mod polars_utils;
pub mod remap;
pub mod source;

pub use csv_table::{CsvTable, detect_delimiter, read_csv_table};
pub use discovery::{is_source_file, list_source_files, resolve_inputs};
pub use error::{IngestError, Result};
pub use ledger::{CONFIRMED_MARK, load_exception_ledger};
pub use polars_utils::{any_to_string, column_strings, string_frame};
pub use remap::ColumnMap;
pub use source::{read_source_frame, read_source_frame_from_tables};
