//! Merge validation.
//!
//! [`validate`] runs before the join and explains every key that only one
//! source knows about. [`verify`] runs after the join and proves that no
//! record was lost or invented on the way.

mod merge;
mod verify;

pub use merge::{ValidationOutcome, validate};
pub use verify::{
    DuplicatePolicy, IntegrityError, IntegrityViolation, VerificationSummary, verify,
    verify_with_fields,
};
