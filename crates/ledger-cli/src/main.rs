//! Accounting header mapper CLI.

use std::io::{self, IsTerminal};
use std::process::ExitCode;

use clap::{ColorChoice, Parser};
use ledger_cli::logging::{LogConfig, LogFormat, init_logging};
use ledger_config::ConfigStore;
use tracing::level_filters::LevelFilter;

mod cli;
mod commands;
mod summary;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg};
use crate::commands::{BatchOutcome, run_balance, run_detect, run_fields, run_init, run_train};

/// Some input files failed; the others were processed.
const PARTIAL_FAILURE: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        return ExitCode::FAILURE;
    }

    if let Command::Init(args) = &cli.command {
        return match run_init(&cli.config, args) {
            Ok(()) => ExitCode::SUCCESS,
            Err(error) => {
                eprintln!("error: {error:#}");
                ExitCode::FAILURE
            }
        };
    }

    // Without a catalog nothing can be matched.
    let store = match ConfigStore::load(&cli.config) {
        Ok(store) => store,
        Err(error) => {
            eprintln!("error: {}", error.user_message());
            if let Some(hint) = error.suggestion() {
                eprintln!("hint: {hint}");
            }
            return ExitCode::FAILURE;
        }
    };

    let result = match &cli.command {
        Command::Fields => {
            run_fields(&store);
            Ok(BatchOutcome::default())
        }
        Command::Detect(args) => run_detect(&store, args),
        Command::Train(args) => run_train(&store, args),
        Command::Balance(args) => run_balance(&store, args),
        Command::Init(_) => Ok(BatchOutcome::default()),
    };

    match result {
        Ok(outcome) if outcome.has_failures() => {
            eprintln!("{} file(s) failed:", outcome.failed.len());
            for (path, error) in &outcome.failed {
                eprintln!("- {}: {error:#}", path.display());
            }
            ExitCode::from(PARTIAL_FAILURE)
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = cli.log_file.clone();
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
