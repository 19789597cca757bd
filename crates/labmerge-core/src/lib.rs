//! Identifier reconciliation engine: rule table, normalizer, pre-merge
//! aggregation and the natural join on the normalized key.

pub mod aggregate;
pub mod error;
pub mod join;
pub mod normalize;
pub mod rules;

pub use aggregate::{
    FieldColumns, KeyAggregate, ParticipantAggregate, ParticipantAggregates, TrialAggregate,
    TrialAggregates, aggregate, aggregate_participants, aggregate_partitioned, aggregate_rows,
    aggregate_trials, merge_aggregates,
};
pub use error::{CoreError, Result};
pub use join::{JoinExecutor, MergedTable, NaturalJoin, PARTICIPANT_SUFFIX, assemble};
pub use normalize::{NormalizedTable, Normalizer, SourceTable};
pub use rules::{
    Field, Pattern, Rewrite, Rule, RuleSpec, RuleTable, RuleTableError, default_rule_specs,
    default_rule_table,
};
