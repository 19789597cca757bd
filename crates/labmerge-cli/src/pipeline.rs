//! Merge pipeline with explicit stages.
//!
//! 1. **Ingest**: resolve inputs, read and remap both sources, load the ledger
//! 2. **Normalize**: apply the rule table to every (lab, subject)
//! 3. **Aggregate**: per-key pre-merge summaries of each source
//! 4. **Validate**: symmetric difference against the ledger, audit reports
//! 5. **Join + Verify**: natural join, then the conservation check
//! 6. **Output**: merged table and run summary, only after verification
//!
//! Each stage takes the output of the previous stage and returns typed results.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{error, info, info_span, trace};

use labmerge_core::{
    JoinExecutor, MergedTable, NormalizedTable, Normalizer, ParticipantAggregates, RuleTable,
    SourceTable, TrialAggregates, aggregate_participants, aggregate_partitioned, aggregate_trials,
};
use labmerge_ingest::{ColumnMap, load_exception_ledger, read_source_frame, resolve_inputs};
use labmerge_model::{ExceptionLedger, FieldNames, InputCounts, MergeReport, SourceKind};
use labmerge_report::{
    clear_merge_outputs, sha256_hex, unconfirmed_rows, write_lab_concordance, write_merge_report,
    write_merged, write_unconfirmed,
};
use labmerge_validate::{
    DuplicatePolicy, ValidationOutcome, VerificationSummary, validate, verify_with_fields,
};

use crate::logging::redact_value;
use crate::types::{MergeResult, OutputPaths};

/// Everything a merge run needs, resolved from CLI flags and config.
#[derive(Debug, Clone)]
pub struct MergeOptions {
    pub trial_inputs: Vec<PathBuf>,
    pub participant_inputs: Vec<PathBuf>,
    pub ledger: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub fields: FieldNames,
    pub column_map: ColumnMap,
    pub rules: RuleTable,
    pub duplicate_policy: DuplicatePolicy,
    /// Aggregation threads; 0 picks the available parallelism.
    pub partitions: usize,
    /// Compute everything, write nothing.
    pub dry_run: bool,
}

// ============================================================================
// Stage 1: Ingest
// ============================================================================

#[derive(Debug)]
pub struct IngestResult {
    pub trial: SourceTable,
    pub participant: SourceTable,
    pub ledger: ExceptionLedger,
}

fn read_source(
    kind: SourceKind,
    inputs: &[PathBuf],
    column_map: &ColumnMap,
) -> Result<SourceTable> {
    let files = resolve_inputs(inputs).with_context(|| format!("resolve {kind} inputs"))?;
    info!(source = %kind, file_count = files.len(), "reading source files");
    let frame =
        read_source_frame(&files, column_map).with_context(|| format!("read {kind} source"))?;
    SourceTable::new(kind, frame).with_context(|| format!("build {kind} table"))
}

pub fn ingest(options: &MergeOptions) -> Result<IngestResult> {
    let trial = read_source(SourceKind::Trial, &options.trial_inputs, &options.column_map)?;
    let participant = read_source(
        SourceKind::Participant,
        &options.participant_inputs,
        &options.column_map,
    )?;
    let ledger = match &options.ledger {
        Some(path) => load_exception_ledger(path).context("load exception ledger")?,
        None => ExceptionLedger::new(),
    };
    Ok(IngestResult {
        trial,
        participant,
        ledger,
    })
}

// ============================================================================
// Stage 2: Normalize
// ============================================================================

#[derive(Debug)]
pub struct NormalizeResult {
    pub trial: NormalizedTable,
    pub participant: NormalizedTable,
    /// Rule hits of both sources combined.
    pub rule_hits: BTreeMap<String, usize>,
}

pub fn normalize(normalizer: &Normalizer, ingested: &IngestResult) -> NormalizeResult {
    let trial = normalizer.normalize_table(&ingested.trial);
    let participant = normalizer.normalize_table(&ingested.participant);
    let mut rule_hits = trial.rule_hits.clone();
    for (rule, hits) in &participant.rule_hits {
        *rule_hits.entry(rule.clone()).or_insert(0) += hits;
    }
    NormalizeResult {
        trial,
        participant,
        rule_hits,
    }
}

// ============================================================================
// Stage 3: Aggregate
// ============================================================================

#[derive(Debug)]
pub struct AggregateResult {
    pub trial: TrialAggregates,
    pub participant: ParticipantAggregates,
}

fn resolve_partitions(requested: usize) -> usize {
    if requested > 0 {
        return requested;
    }
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
}

pub fn aggregate(
    normalized: &NormalizeResult,
    fields: &FieldNames,
    partitions: usize,
) -> Result<AggregateResult> {
    let partitions = resolve_partitions(partitions);
    if partitions <= 1 {
        return Ok(AggregateResult {
            trial: aggregate_trials(&normalized.trial, fields)?,
            participant: aggregate_participants(&normalized.participant, fields)?,
        });
    }
    let trial: TrialAggregates = aggregate_partitioned(&normalized.trial, fields, partitions);
    let participant: ParticipantAggregates =
        aggregate_partitioned(&normalized.participant, fields, partitions);
    info!(
        partitions,
        trial_keys = trial.len(),
        participant_keys = participant.len(),
        "partitioned aggregation complete"
    );
    Ok(AggregateResult { trial, participant })
}

// ============================================================================
// Stage 4: Validate
// ============================================================================

pub fn validate_keys(aggregates: &AggregateResult, ledger: &ExceptionLedger) -> ValidationOutcome {
    let outcome = validate(&aggregates.trial, &aggregates.participant, ledger);
    for item in outcome.unconfirmed() {
        let key = item.key.to_string();
        trace!(
            key = redact_value(&key),
            missing_from = %item.missing_from,
            "unconfirmed discrepancy"
        );
    }
    outcome
}

/// Write `unconfirmed_unmatched.csv` and `lab_concordance.csv`.
pub fn write_validation_reports(
    output_dir: &Path,
    outcome: &ValidationOutcome,
    aggregates: &AggregateResult,
) -> Result<(PathBuf, PathBuf)> {
    let rows = unconfirmed_rows(outcome, &aggregates.trial, &aggregates.participant);
    let unconfirmed = write_unconfirmed(output_dir, &rows).context("write unconfirmed report")?;
    let concordance = write_lab_concordance(output_dir, &outcome.lab_summary)
        .context("write lab concordance")?;
    Ok((unconfirmed, concordance))
}

// ============================================================================
// Stage 5: Join + Verify
// ============================================================================

/// Join, then verify. An integrity failure is returned as the
/// [`labmerge_validate::IntegrityError`] itself so callers can downcast it.
pub fn join_and_verify<J: JoinExecutor + ?Sized>(
    executor: &J,
    normalized: &NormalizeResult,
    aggregates: &AggregateResult,
    outcome: &ValidationOutcome,
    fields: &FieldNames,
    policy: DuplicatePolicy,
) -> Result<(MergedTable, VerificationSummary)> {
    let merged = executor
        .join(&normalized.trial, &normalized.participant)
        .with_context(|| format!("{} join", executor.name()))?;
    let summary = verify_with_fields(
        &merged,
        &aggregates.trial,
        &aggregates.participant,
        &outcome.unconfirmed_keys(),
        policy,
        fields,
    )
    .inspect_err(|err| {
        for violation in &err.violations {
            let key = violation.key().to_string();
            error!(key = redact_value(&key), "{}", violation.detail());
        }
    })?;
    Ok((merged, summary))
}

// ============================================================================
// Stage 6: Output
// ============================================================================

/// Write `merged.csv` then `merge_report.json` carrying its digest.
pub fn write_outputs(
    output_dir: &Path,
    merged: &MergedTable,
    mut report: MergeReport,
) -> Result<(PathBuf, PathBuf)> {
    let (merged_path, bytes) = write_merged(output_dir, merged).context("write merged table")?;
    report.merged_sha256 = Some(sha256_hex(&bytes));
    let report_path = write_merge_report(output_dir, &report).context("write merge report")?;
    Ok((merged_path, report_path))
}

/// Run every stage with the given join strategy.
pub fn run_merge_pipeline<J: JoinExecutor + ?Sized>(
    options: &MergeOptions,
    executor: &J,
) -> Result<MergeResult> {
    let run_span = info_span!("merge", output_dir = %options.output_dir.display());
    let _run_guard = run_span.enter();
    let run_start = Instant::now();

    let ingested = info_span!("ingest").in_scope(|| ingest(options))?;
    let normalizer = Normalizer::new(options.rules.clone());
    let normalized = info_span!("normalize").in_scope(|| normalize(&normalizer, &ingested));
    let aggregates = info_span!("aggregate")
        .in_scope(|| aggregate(&normalized, &options.fields, options.partitions))?;

    let outcome = info_span!("validate").in_scope(|| validate_keys(&aggregates, &ingested.ledger));
    let mut outputs = OutputPaths::default();
    if !options.dry_run {
        clear_merge_outputs(&options.output_dir).context("clear previous merge outputs")?;
        let (unconfirmed, concordance) =
            write_validation_reports(&options.output_dir, &outcome, &aggregates)?;
        outputs.unconfirmed = Some(unconfirmed);
        outputs.lab_concordance = Some(concordance);
    }

    let (merged, verification) = info_span!("join").in_scope(|| {
        join_and_verify(
            executor,
            &normalized,
            &aggregates,
            &outcome,
            &options.fields,
            options.duplicate_policy,
        )
    })?;

    let inputs = InputCounts {
        trial_rows: normalized.trial.height(),
        participant_rows: normalized.participant.height(),
        trial_keys: aggregates.trial.len(),
        participant_keys: aggregates.participant.len(),
    };
    let report = MergeReport::new(
        inputs.clone(),
        outcome.counts(),
        outcome.matched_keys,
        merged.height(),
        verification.status,
    );
    if !options.dry_run {
        let (merged_path, report_path) = write_outputs(&options.output_dir, &merged, report)?;
        outputs.merged = Some(merged_path);
        outputs.report = Some(report_path);
    }

    info!(
        merged_rows = merged.height(),
        dry_run = options.dry_run,
        duration_ms = run_start.elapsed().as_millis(),
        "merge complete"
    );
    Ok(MergeResult {
        output_dir: options.output_dir.clone(),
        inputs,
        discrepancies: outcome.counts(),
        lab_summary: outcome.lab_summary,
        matched_keys: outcome.matched_keys,
        merged_rows: merged.height(),
        verification: verification.status,
        rule_hits: normalized.rule_hits,
        outputs,
        dry_run: options.dry_run,
    })
}
