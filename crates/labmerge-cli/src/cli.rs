//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "labmerge",
    version,
    about = "Reconcile lab/subject identifiers and merge trial and participant data",
    long_about = "Reconcile lab/subject identifiers across independently collected\n\
                  trial-level and participant-level files, flag every unexplained\n\
                  discrepancy, and write a merged table that is verified to\n\
                  conserve every matched record."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow lab/subject identifiers to appear in trace logs.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Normalize, validate, join and verify the two sources.
    Merge(MergeArgs),

    /// List the active identifier rules in application order.
    Rules(RulesArgs),
}

#[derive(Parser)]
pub struct MergeArgs {
    /// Trial-level source files or directories.
    #[arg(value_name = "TRIAL", required = true)]
    pub trials: Vec<PathBuf>,

    /// Participant-level source files or directories.
    #[arg(
        long = "participants",
        short = 'p',
        value_name = "PATH",
        required = true,
        num_args = 1..
    )]
    pub participants: Vec<PathBuf>,

    /// Exception ledger CSV (subject, lab, Confirmed).
    #[arg(long = "ledger", value_name = "PATH")]
    pub ledger: Option<PathBuf>,

    /// Output directory (default: ./labmerge-output).
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// JSON config file (default: $LABMERGE_CONFIG).
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Tolerate several participant rows per key.
    ///
    /// Each such key is expected to yield trial rows x participant rows merged
    /// rows and is reported as a warning instead of failing the run.
    #[arg(long = "allow-duplicate-participants")]
    pub allow_duplicate_participants: bool,

    /// Aggregation threads (0 = available parallelism).
    #[arg(long = "partitions", value_name = "N")]
    pub partitions: Option<usize>,

    /// Validate and report without writing output files.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(Parser)]
pub struct RulesArgs {
    /// JSON config file (default: $LABMERGE_CONFIG).
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
