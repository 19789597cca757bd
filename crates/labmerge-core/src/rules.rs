//! Declarative identifier rules.
//!
//! Per-lab identifier fixes are data, not code. A [`RuleSpec`] is the
//! serializable form read from configuration; [`RuleTable`] compiles the specs
//! once and keeps them in application order.
//!
//! # Matching
//!
//! Literal patterns (`exact`, `one_of`, `prefix`, `contains`) and `numeric`
//! compare in canonical form: both sides are lowercased and stripped of every
//! non-alphanumeric character first, so `"Lancs-Lab"` matches
//! `exact: "lancslab"`. Regex patterns see the value as-is (already
//! lowercased by the normalizer) and are the caller's responsibility to keep
//! idempotent.
//!
//! # Order
//!
//! Rules run in table order and each rewrite sees the output of the previous
//! one. Order is part of the contract.

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use labmerge_model::{SourceKind, SourceScope, canonicalize_identifier};

/// Errors raised while compiling a rule table. Rules never fail at apply time.
#[derive(Debug, Error)]
pub enum RuleTableError {
    #[error("rule '{id}': invalid regex '{pattern}': {source}")]
    InvalidRegex {
        id: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("duplicate rule id '{0}'")]
    DuplicateId(String),
    #[error("rule id must not be empty")]
    EmptyId,
}

/// Identifier field a rule rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Lab,
    Subject,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lab => "lab",
            Self::Subject => "subject",
        }
    }
}

/// Match predicate, in serializable form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Pattern {
    #[default]
    Any,
    Exact(String),
    OneOf(Vec<String>),
    Prefix(String),
    Contains(String),
    /// Canonical form is non-empty and all ASCII digits.
    Numeric,
    Regex(String),
}

impl Pattern {
    fn describe(&self) -> String {
        match self {
            Self::Any => "*".to_string(),
            Self::Exact(value) => format!("= {value}"),
            Self::OneOf(values) => format!("in [{}]", values.join(", ")),
            Self::Prefix(value) => format!("{value}*"),
            Self::Contains(value) => format!("*{value}*"),
            Self::Numeric => "numeric".to_string(),
            Self::Regex(pattern) => format!("/{pattern}/"),
        }
    }
}

/// Rewrite applied to a matched field, in serializable form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rewrite {
    /// Replace the whole value.
    Set { value: String },
    /// Replace every occurrence of a substring.
    ReplaceText { from: String, to: String },
    /// Regex `replace_all`; `$1`-style group references are allowed.
    RegexReplace { pattern: String, replacement: String },
    /// Strip one or more leading occurrences of `prefix`, each compared in
    /// canonical form and followed by any separators.
    StripRepeatedPrefix { prefix: String },
    /// Drop leading zeros and separators, keeping a single `0` for an
    /// all-zero value.
    TrimLeadingZeros,
}

impl Rewrite {
    fn describe(&self) -> String {
        match self {
            Self::Set { value } => format!("set '{value}'"),
            Self::ReplaceText { from, to } => format!("replace '{from}' -> '{to}'"),
            Self::RegexReplace {
                pattern,
                replacement,
            } => format!("s/{pattern}/{replacement}/"),
            Self::StripRepeatedPrefix { prefix } => format!("strip prefix '{prefix}'"),
            Self::TrimLeadingZeros => "trim leading zeros".to_string(),
        }
    }
}

/// Serializable rule definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub id: String,
    #[serde(default)]
    pub source: SourceScope,
    /// Predicate on the lowercased raw lab; `None` applies to every lab.
    #[serde(default)]
    pub lab: Option<Pattern>,
    pub field: Field,
    #[serde(rename = "match", default)]
    pub matcher: Pattern,
    pub rewrite: Rewrite,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone)]
enum Matcher {
    Any,
    Exact(String),
    OneOf(BTreeSet<String>),
    Prefix(String),
    Contains(String),
    Numeric,
    Regex(Regex),
}

impl Matcher {
    fn compile(id: &str, pattern: &Pattern) -> Result<Self, RuleTableError> {
        Ok(match pattern {
            Pattern::Any => Self::Any,
            Pattern::Exact(value) => Self::Exact(canonicalize_identifier(value)),
            Pattern::OneOf(values) => Self::OneOf(
                values
                    .iter()
                    .map(|value| canonicalize_identifier(value))
                    .collect(),
            ),
            Pattern::Prefix(value) => Self::Prefix(canonicalize_identifier(value)),
            Pattern::Contains(value) => Self::Contains(canonicalize_identifier(value)),
            Pattern::Numeric => Self::Numeric,
            Pattern::Regex(pattern) => Self::Regex(compile_regex(id, pattern)?),
        })
    }

    fn is_match(&self, value: &str) -> bool {
        let canonical = || canonicalize_identifier(value);
        match self {
            Self::Any => true,
            Self::Regex(regex) => regex.is_match(value),
            Self::Exact(expected) => canonical() == *expected,
            Self::OneOf(expected) => expected.contains(&canonical()),
            Self::Prefix(prefix) => canonical().starts_with(prefix.as_str()),
            Self::Contains(needle) => canonical().contains(needle.as_str()),
            Self::Numeric => {
                let canonical = canonical();
                !canonical.is_empty() && canonical.chars().all(|ch| ch.is_ascii_digit())
            }
        }
    }
}

#[derive(Debug, Clone)]
enum Rewriter {
    Set(String),
    ReplaceText { from: String, to: String },
    RegexReplace { regex: Regex, replacement: String },
    StripRepeatedPrefix(String),
    TrimLeadingZeros,
}

impl Rewriter {
    fn compile(id: &str, rewrite: &Rewrite) -> Result<Self, RuleTableError> {
        Ok(match rewrite {
            Rewrite::Set { value } => Self::Set(value.clone()),
            Rewrite::ReplaceText { from, to } => Self::ReplaceText {
                from: from.to_lowercase(),
                to: to.clone(),
            },
            Rewrite::RegexReplace {
                pattern,
                replacement,
            } => Self::RegexReplace {
                regex: compile_regex(id, pattern)?,
                replacement: replacement.clone(),
            },
            Rewrite::StripRepeatedPrefix { prefix } => {
                Self::StripRepeatedPrefix(canonicalize_identifier(prefix))
            }
            Rewrite::TrimLeadingZeros => Self::TrimLeadingZeros,
        })
    }

    fn apply(&self, value: &str) -> String {
        match self {
            Self::Set(replacement) => replacement.clone(),
            Self::ReplaceText { from, to } => {
                if from.is_empty() {
                    value.to_string()
                } else {
                    value.replace(from.as_str(), to)
                }
            }
            Self::RegexReplace { regex, replacement } => {
                regex.replace_all(value, replacement.as_str()).into_owned()
            }
            Self::StripRepeatedPrefix(prefix) => strip_repeated_prefix(value, prefix),
            Self::TrimLeadingZeros => trim_leading_zeros(value),
        }
    }
}

fn compile_regex(id: &str, pattern: &str) -> Result<Regex, RuleTableError> {
    Regex::new(pattern).map_err(|source| RuleTableError::InvalidRegex {
        id: id.to_string(),
        pattern: pattern.to_string(),
        source,
    })
}

/// Byte length of the leading segment of `value` whose alphanumeric
/// characters spell `prefix`, or `None` if it does not start with it.
fn canonical_prefix_len(value: &str, prefix: &str) -> Option<usize> {
    let mut expected = prefix.chars().peekable();
    for (idx, ch) in value.char_indices() {
        let Some(next) = expected.peek() else {
            return Some(idx);
        };
        if !ch.is_alphanumeric() {
            continue;
        }
        if ch.to_lowercase().eq(std::iter::once(*next)) {
            expected.next();
        } else {
            return None;
        }
    }
    if expected.peek().is_none() {
        Some(value.len())
    } else {
        None
    }
}

fn skip_separators(value: &str) -> &str {
    value.trim_start_matches(|ch: char| !ch.is_alphanumeric())
}

fn strip_repeated_prefix(value: &str, prefix: &str) -> String {
    if prefix.is_empty() {
        return value.to_string();
    }
    let mut rest = value;
    while let Some(len) = canonical_prefix_len(rest, prefix) {
        rest = skip_separators(&rest[len..]);
    }
    rest.to_string()
}

fn trim_leading_zeros(value: &str) -> String {
    let trimmed = value.trim_start_matches(|ch: char| ch == '0' || !ch.is_alphanumeric());
    if trimmed.is_empty() && value.contains('0') {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// A compiled rule.
#[derive(Debug, Clone)]
pub struct Rule {
    spec: RuleSpec,
    lab: Option<Matcher>,
    matcher: Matcher,
    rewriter: Rewriter,
}

impl Rule {
    pub fn compile(spec: RuleSpec) -> Result<Self, RuleTableError> {
        if spec.id.trim().is_empty() {
            return Err(RuleTableError::EmptyId);
        }
        let lab = spec
            .lab
            .as_ref()
            .map(|pattern| Matcher::compile(&spec.id, pattern))
            .transpose()?;
        let matcher = Matcher::compile(&spec.id, &spec.matcher)?;
        let rewriter = Rewriter::compile(&spec.id, &spec.rewrite)?;
        Ok(Self {
            spec,
            lab,
            matcher,
            rewriter,
        })
    }

    pub fn id(&self) -> &str {
        &self.spec.id
    }

    pub fn field(&self) -> Field {
        self.spec.field
    }

    pub fn spec(&self) -> &RuleSpec {
        &self.spec
    }

    /// Whether the rule is in scope for this source and (lowercased) raw lab.
    pub fn applies_to(&self, kind: SourceKind, raw_lab_lower: &str) -> bool {
        self.spec.source.includes(kind)
            && self
                .lab
                .as_ref()
                .is_none_or(|matcher| matcher.is_match(raw_lab_lower))
    }

    /// Rewrite `value` if it matches; otherwise `None`.
    pub fn rewrite(&self, value: &str) -> Option<String> {
        if self.matcher.is_match(value) {
            Some(self.rewriter.apply(value))
        } else {
            None
        }
    }

    /// One-line summary used by the `rules` listing.
    pub fn describe_lab(&self) -> String {
        self.spec
            .lab
            .as_ref()
            .map(Pattern::describe)
            .unwrap_or_else(|| "*".to_string())
    }

    pub fn describe_match(&self) -> String {
        self.spec.matcher.describe()
    }

    pub fn describe_rewrite(&self) -> String {
        self.spec.rewrite.describe()
    }
}

/// Ordered, immutable set of compiled rules.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile specs in order. Ids must be unique.
    pub fn from_specs<I>(specs: I) -> Result<Self, RuleTableError>
    where
        I: IntoIterator<Item = RuleSpec>,
    {
        let mut table = Self::new();
        table.extend(specs)?;
        Ok(table)
    }

    /// Append specs after the existing rules.
    pub fn extend<I>(&mut self, specs: I) -> Result<(), RuleTableError>
    where
        I: IntoIterator<Item = RuleSpec>,
    {
        let mut seen: BTreeSet<String> = self.rules.iter().map(|r| r.id().to_string()).collect();
        for spec in specs {
            if !seen.insert(spec.id.clone()) {
                return Err(RuleTableError::DuplicateId(spec.id));
            }
            self.rules.push(Rule::compile(spec)?);
        }
        Ok(())
    }

    /// Remove rules by id. Unknown ids are returned.
    pub fn disable<'a, I>(&mut self, ids: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut unknown = Vec::new();
        for id in ids {
            let before = self.rules.len();
            self.rules.retain(|rule| rule.id() != id);
            if self.rules.len() == before {
                unknown.push(id.to_string());
            }
        }
        unknown
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// Number of rules per field, for logging.
    pub fn field_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for rule in &self.rules {
            *counts.entry(rule.field().as_str()).or_insert(0) += 1;
        }
        counts
    }
}

fn spec(
    id: &str,
    source: SourceScope,
    lab: Option<Pattern>,
    field: Field,
    matcher: Pattern,
    rewrite: Rewrite,
    description: &str,
) -> RuleSpec {
    RuleSpec {
        id: id.to_string(),
        source,
        lab,
        field,
        matcher,
        rewrite,
        description: description.to_string(),
    }
}

fn one_of(values: &[&str]) -> Pattern {
    Pattern::OneOf(values.iter().map(|v| (*v).to_string()).collect())
}

const VIRGINIA_ALIASES: &[&str] = &["uva", "universityofvirginia", "uvirginia"];
const OXFORD_ALIASES: &[&str] = &["oxon", "oxfordlab"];

/// The built-in corrections for known site conventions.
///
/// Lab renames come first; subject rules are keyed on the raw lab so they
/// fire regardless of how the lab itself was rewritten.
pub fn default_rule_specs() -> Vec<RuleSpec> {
    let mut virginia_labs = VIRGINIA_ALIASES.to_vec();
    virginia_labs.push("virginia");
    let mut oxford_labs = OXFORD_ALIASES.to_vec();
    oxford_labs.push("oxford");

    vec![
        spec(
            "lab-lancaster",
            SourceScope::Both,
            None,
            Field::Lab,
            one_of(&["lancslab", "lancs", "lancasteruniversity"]),
            Rewrite::Set {
                value: "lancaster".to_string(),
            },
            "Lancaster entered its lab code instead of the site name",
        ),
        spec(
            "lab-kent",
            SourceScope::Both,
            None,
            Field::Lab,
            Pattern::Contains("kent".to_string()),
            Rewrite::Set {
                value: "kent".to_string(),
            },
            "Kent uses several spellings of the university name",
        ),
        spec(
            "lab-virginia",
            SourceScope::Both,
            None,
            Field::Lab,
            one_of(VIRGINIA_ALIASES),
            Rewrite::Set {
                value: "virginia".to_string(),
            },
            "Virginia abbreviations",
        ),
        spec(
            "lab-oxford",
            SourceScope::Both,
            None,
            Field::Lab,
            one_of(OXFORD_ALIASES),
            Rewrite::Set {
                value: "oxford".to_string(),
            },
            "Oxford abbreviations",
        ),
        spec(
            "subject-kent-prefix",
            SourceScope::Trial,
            Some(Pattern::Contains("kent".to_string())),
            Field::Subject,
            Pattern::Any,
            Rewrite::StripRepeatedPrefix {
                prefix: "kent".to_string(),
            },
            "Kent trial files prefix subject ids with the lab name",
        ),
        spec(
            "subject-virginia-padding",
            SourceScope::Both,
            Some(one_of(&virginia_labs)),
            Field::Subject,
            Pattern::Numeric,
            Rewrite::TrimLeadingZeros,
            "Virginia zero-pads numeric subject ids inconsistently",
        ),
        spec(
            "subject-oxford-prefix",
            SourceScope::Participant,
            Some(one_of(&oxford_labs)),
            Field::Subject,
            Pattern::Any,
            Rewrite::StripRepeatedPrefix {
                prefix: "subj".to_string(),
            },
            "Oxford participant sheets prefix subject ids with 'subj'",
        ),
    ]
}

/// Compiled built-in table.
pub fn default_rule_table() -> RuleTable {
    let mut table = RuleTable::new();
    for spec in default_rule_specs() {
        // Built-in specs use literal patterns only and cannot fail to compile.
        if let Ok(rule) = Rule::compile(spec) {
            table.rules.push(rule);
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_repeated_prefix_ignores_separators() {
        assert_eq!(strip_repeated_prefix("kent_01", "kent"), "01");
        assert_eq!(strip_repeated_prefix("k-ent_kent01", "kent"), "01");
        assert_eq!(strip_repeated_prefix("kentucky", "kent"), "ucky");
        assert_eq!(strip_repeated_prefix("ke_01", "kent"), "ke_01");
        assert_eq!(strip_repeated_prefix("kent", "kent"), "");
    }

    #[test]
    fn trim_leading_zeros_keeps_single_zero() {
        assert_eq!(trim_leading_zeros("0_07"), "7");
        assert_eq!(trim_leading_zeros("0070"), "70");
        assert_eq!(trim_leading_zeros("000"), "0");
        assert_eq!(trim_leading_zeros(""), "");
    }

    #[test]
    fn default_table_compiles_every_spec() {
        assert_eq!(default_rule_table().len(), default_rule_specs().len());
    }

    #[test]
    fn field_counts_split_lab_and_subject_rules() {
        let counts = default_rule_table().field_counts();
        assert_eq!(counts.get("lab"), Some(&4));
        assert_eq!(counts.get("subject"), Some(&3));
    }
}
