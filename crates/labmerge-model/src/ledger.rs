use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{ModelError, NormalizedKey};

/// One row of the exception ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionEntry {
    pub lab: String,
    pub subject: String,
    pub confirmed: bool,
}

impl ExceptionEntry {
    pub fn key(&self) -> NormalizedKey {
        NormalizedKey::canonical(&self.lab, &self.subject)
    }
}

/// Read-only allowlist of keys known to exist in only one source.
///
/// Entries are keyed in canonical key space. The ledger is never mutated
/// once a run has started.
#[derive(Debug, Clone, Default)]
pub struct ExceptionLedger {
    entries: BTreeMap<NormalizedKey, ExceptionEntry>,
}

impl ExceptionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ledger, rejecting two rows that canonicalize to the same key
    /// with conflicting confirmation flags.
    pub fn from_entries<I>(entries: I) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = ExceptionEntry>,
    {
        let mut map: BTreeMap<NormalizedKey, ExceptionEntry> = BTreeMap::new();
        for entry in entries {
            let key = entry.key();
            if let Some(existing) = map.get(&key) {
                if existing.confirmed != entry.confirmed {
                    return Err(ModelError::DuplicateLedgerEntry {
                        lab: key.lab,
                        subject: key.subject,
                    });
                }
                continue;
            }
            map.insert(key, entry);
        }
        Ok(Self { entries: map })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &NormalizedKey) -> Option<&ExceptionEntry> {
        self.entries.get(key)
    }

    /// True when the key carries a confirmed entry.
    pub fn is_confirmed(&self, key: &NormalizedKey) -> bool {
        self.entries.get(key).is_some_and(|entry| entry.confirmed)
    }

    pub fn confirmed_count(&self) -> usize {
        self.entries.values().filter(|entry| entry.confirmed).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NormalizedKey, &ExceptionEntry)> {
        self.entries.iter()
    }
}
