//! CLI argument definitions for the header mapper.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use ledger_cli::input::parse_delimiter;
use ledger_config::DEFAULT_CONFIG_PATH;

#[derive(Parser)]
#[command(
    name = "ledger-mapper",
    version,
    about = "Map accounting export headers onto canonical journal fields",
    long_about = "Map the column headers of accounting exports (SAP, ContaPlus, ...) onto\n\
                  seventeen canonical journal entry fields, learn new synonyms from\n\
                  confirmed mappings and check debit/credit balance."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Knowledge base file.
    #[arg(
        long = "config",
        value_name = "PATH",
        default_value = DEFAULT_CONFIG_PATH,
        global = true
    )]
    pub config: PathBuf,

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
}

#[derive(Subcommand)]
pub enum Command {
    /// List the canonical fields and their synonym counts.
    Fields,

    /// Write a knowledge base seeded with the built-in catalog.
    Init(InitArgs),

    /// Show candidates per header and the inferred ERP.
    Detect(DetectArgs),

    /// Run a training session per file and learn confirmed synonyms.
    Train(TrainArgs),

    /// Map headers and check that journal entries balance.
    Balance(BalanceArgs),
}

#[derive(Args)]
pub struct InitArgs {
    /// Replace an existing knowledge base.
    #[arg(long = "force")]
    pub force: bool,
}

#[derive(Args)]
pub struct InputArgs {
    /// Delimited files with a header row.
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,

    /// Field delimiter (single character or `tab`); sniffed when omitted.
    #[arg(long = "delimiter", value_name = "CHAR", value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
}

#[derive(Args)]
pub struct DetectArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// ERP to match against, or `auto` to infer it.
    #[arg(long = "erp", value_name = "NAME", default_value = "auto")]
    pub erp: String,

    /// Print results as JSON instead of tables.
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Args)]
pub struct TrainArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// How suggestions are decided.
    #[arg(long = "mode", value_enum, default_value = "manual")]
    pub mode: TrainerModeArg,

    /// ERP to learn under, or `auto` to infer it per file.
    #[arg(long = "erp", value_name = "NAME", default_value = "auto")]
    pub erp: String,

    /// Never prompt; undecided headers are skipped.
    #[arg(long = "batch")]
    pub batch: bool,

    /// Auto-accept threshold for automatic and complete modes.
    #[arg(long = "threshold", value_name = "CONFIDENCE")]
    pub threshold: Option<f64>,
}

#[derive(Args)]
pub struct BalanceArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// ERP to match against, or `auto` to infer it.
    #[arg(long = "erp", value_name = "NAME", default_value = "auto")]
    pub erp: String,

    /// Residual below which an entry counts as balanced.
    #[arg(long = "epsilon", value_name = "AMOUNT", default_value_t = ledger_validate::DEFAULT_EPSILON)]
    pub epsilon: f64,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum TrainerModeArg {
    Manual,
    Automatic,
    /// Automatic plus balance check.
    #[value(alias = "enhanced")]
    Complete,
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
