use std::path::PathBuf;

use anyhow::Result;
use comfy_table::Table;
use tracing::info;

use labmerge_cli::config::MergeConfig;
use labmerge_cli::pipeline::{MergeOptions, run_merge_pipeline};
use labmerge_cli::types::MergeResult;
use labmerge_core::NaturalJoin;
use labmerge_validate::DuplicatePolicy;

use crate::cli::{MergeArgs, RulesArgs};
use crate::summary::apply_table_style;

const DEFAULT_OUTPUT_DIR: &str = "labmerge-output";

/// Combine CLI flags with the config file. Flags win.
fn merge_options(args: &MergeArgs, config: MergeConfig) -> Result<MergeOptions> {
    let rules = config.rule_table()?;
    let column_map = config.column_map();
    let allow_duplicates = args.allow_duplicate_participants || config.allow_duplicate_participants;
    Ok(MergeOptions {
        trial_inputs: args.trials.clone(),
        participant_inputs: args.participants.clone(),
        ledger: args.ledger.clone().or(config.ledger),
        output_dir: args
            .output_dir
            .clone()
            .or(config.output_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        fields: config.fields,
        column_map,
        rules,
        duplicate_policy: if allow_duplicates {
            DuplicatePolicy::Allow
        } else {
            DuplicatePolicy::Fatal
        },
        partitions: args.partitions.unwrap_or(config.partitions),
        dry_run: args.dry_run,
    })
}

pub fn run_merge(args: &MergeArgs) -> Result<MergeResult> {
    let config = MergeConfig::resolve(args.config.as_deref())?;
    let options = merge_options(args, config)?;
    info!(
        rules = options.rules.len(),
        rules_by_field = ?options.rules.field_counts(),
        duplicate_policy = ?options.duplicate_policy,
        dry_run = options.dry_run,
        "starting merge"
    );
    run_merge_pipeline(&options, &NaturalJoin)
}

pub fn run_rules(args: &RulesArgs) -> Result<()> {
    let config = MergeConfig::resolve(args.config.as_deref())?;
    let rules = config.rule_table()?;
    let mut table = Table::new();
    table.set_header(vec![
        "#", "Id", "Source", "Field", "Lab", "Match", "Rewrite", "Description",
    ]);
    apply_table_style(&mut table);
    for (index, rule) in rules.iter().enumerate() {
        let spec = rule.spec();
        table.add_row(vec![
            (index + 1).to_string(),
            spec.id.clone(),
            spec.source.as_str().to_string(),
            rule.field().as_str().to_string(),
            rule.describe_lab(),
            rule.describe_match(),
            rule.describe_rewrite(),
            spec.description.clone(),
        ]);
    }
    println!("{table}");
    Ok(())
}
