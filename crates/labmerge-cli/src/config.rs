//! Run configuration loaded from an optional JSON file.
//!
//! ```json
//! {
//!   "fields": { "trial": "trial_no" },
//!   "column_aliases": { "lab": ["centre"] },
//!   "rules": [
//!     {
//!       "id": "lab-york",
//!       "field": "lab",
//!       "match": { "kind": "one_of", "value": ["yrk", "uoy"] },
//!       "rewrite": { "kind": "set", "value": "york" }
//!     }
//!   ],
//!   "disabled_rules": ["lab-oxford"]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use labmerge_core::{RuleSpec, RuleTable, default_rule_specs};
use labmerge_ingest::ColumnMap;
use labmerge_model::FieldNames;

/// Environment variable naming a config file used when `--config` is absent.
pub const CONFIG_ENV: &str = "LABMERGE_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MergeConfig {
    /// Canonical names of the aggregated fields.
    pub fields: FieldNames,
    /// Extra header aliases, keyed by canonical column name.
    pub column_aliases: BTreeMap<String, Vec<String>>,
    /// Rules appended after the built-in table.
    pub rules: Vec<RuleSpec>,
    /// Start from an empty table instead of the built-in rules.
    pub replace_default_rules: bool,
    /// Built-in rule ids to drop.
    pub disabled_rules: Vec<String>,
    pub ledger: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub allow_duplicate_participants: bool,
    /// Worker threads for aggregation; 0 picks the available parallelism.
    pub partitions: usize,
}

impl MergeConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("parse config {}", path.display()))
    }

    /// Load the file named by `explicit`, else by [`CONFIG_ENV`], else defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match std::env::var_os(CONFIG_ENV) {
            Some(path) if !path.is_empty() => Self::load(Path::new(&path)),
            _ => Ok(Self::default()),
        }
    }

    /// The active rule table: built-ins (unless replaced), minus disabled
    /// ids, followed by the configured rules.
    pub fn rule_table(&self) -> Result<RuleTable> {
        let mut table = if self.replace_default_rules {
            RuleTable::new()
        } else {
            RuleTable::from_specs(default_rule_specs()).context("compile built-in rules")?
        };
        let unknown = table.disable(self.disabled_rules.iter().map(String::as_str));
        if !unknown.is_empty() {
            bail!("cannot disable unknown rule(s): {}", unknown.join(", "));
        }
        table
            .extend(self.rules.iter().cloned())
            .context("compile configured rules")?;
        Ok(table)
    }

    pub fn column_map(&self) -> ColumnMap {
        let mut map = ColumnMap::with_defaults(&self.fields);
        for (canonical, aliases) in &self.column_aliases {
            map.add_aliases(canonical, aliases);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_default() {
        let config: MergeConfig = serde_json::from_str("{}").expect("parse");
        assert_eq!(config, MergeConfig::default());
        assert_eq!(
            config.rule_table().expect("rules").len(),
            default_rule_specs().len()
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(serde_json::from_str::<MergeConfig>(r#"{"rule": []}"#).is_err());
    }

    #[test]
    fn disabling_unknown_rule_fails() {
        let config = MergeConfig {
            disabled_rules: vec!["lab-nowhere".to_string()],
            ..MergeConfig::default()
        };
        assert!(config.rule_table().is_err());
    }
}
