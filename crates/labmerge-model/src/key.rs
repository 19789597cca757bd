use std::fmt;

use serde::{Deserialize, Serialize};

/// A (lab, subject) pair after identifier normalization.
///
/// Equality on this pair is the only join predicate. Ordering is lab first,
/// then subject, which keeps every keyed collection deterministic.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct NormalizedKey {
    pub lab: String,
    pub subject: String,
}

impl NormalizedKey {
    pub fn new(lab: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            lab: lab.into(),
            subject: subject.into(),
        }
    }

    /// Builds a key by running both parts through [`canonicalize_identifier`].
    pub fn canonical(lab: &str, subject: &str) -> Self {
        Self {
            lab: canonicalize_identifier(lab),
            subject: canonicalize_identifier(subject),
        }
    }

    /// True when either part normalized to nothing.
    pub fn is_degenerate(&self) -> bool {
        self.lab.is_empty() || self.subject.is_empty()
    }
}

impl fmt::Display for NormalizedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.lab, self.subject)
    }
}

/// The generic pass shared by every record: lowercase, then drop every
/// character that is not alphanumeric.
pub fn canonicalize_identifier(value: &str) -> String {
    value
        .to_lowercase()
        .chars()
        .filter(|ch| ch.is_alphanumeric())
        .collect()
}
