use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{error, info, info_span};

use ledger_cli::input::{TabularFile, read_table};
use ledger_cli::prompt::ConsoleConfirmer;
use ledger_cli::report::{check_balance, detect};
use ledger_config::ConfigStore;
use ledger_model::KnowledgeBase;
use ledger_train::{
    Confirmer, DEFAULT_AUTOMATIC_THRESHOLD, ErpSelector, LearningEngine, TrainerMode,
    TrainerPolicy,
};

use crate::cli::{BalanceArgs, DetectArgs, InitArgs, InputArgs, TrainArgs, TrainerModeArg};
use crate::summary::{print_balance, print_detection, print_fields, print_session};

/// Files of one command that were processed and that failed.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub processed: usize,
    pub failed: Vec<(PathBuf, anyhow::Error)>,
}

impl BatchOutcome {
    fn record(&mut self, path: &Path, result: Result<()>) {
        match result {
            Ok(()) => self.processed += 1,
            Err(err) => {
                error!(path = %path.display(), error = %format!("{err:#}"), "file failed");
                self.failed.push((path.to_path_buf(), err));
            }
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

pub fn run_fields(store: &ConfigStore) {
    print_fields(&store.snapshot());
}

pub fn run_init(config: &Path, args: &InitArgs) -> Result<()> {
    if config.exists() && !args.force {
        bail!(
            "{} already exists (use --force to replace it)",
            config.display()
        );
    }
    let store = ConfigStore::create(config, KnowledgeBase::with_default_catalog())
        .map_err(|err| anyhow::anyhow!(err.user_message()))
        .with_context(|| format!("initialize {}", config.display()))?;
    let kb = store.snapshot();
    println!(
        "Wrote {} fields with {} ERPs to {}",
        kb.len(),
        kb.erp_names().len(),
        config.display()
    );
    Ok(())
}

pub fn run_detect(store: &ConfigStore, args: &DetectArgs) -> Result<BatchOutcome> {
    let erp: ErpSelector = args.erp.parse()?;
    let kb = store.snapshot();
    Ok(for_each_file(&args.input, |file| {
        let report = detect(&kb, file, &erp);
        if args.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_detection(&report);
        }
        Ok(())
    }))
}

pub fn run_train(store: &ConfigStore, args: &TrainArgs) -> Result<BatchOutcome> {
    let erp: ErpSelector = args.erp.parse()?;
    let policy = TrainerPolicy {
        mode: match args.mode {
            TrainerModeArg::Manual => TrainerMode::Manual,
            TrainerModeArg::Automatic => TrainerMode::Automatic,
            TrainerModeArg::Complete => TrainerMode::Complete,
        },
        confidence_threshold: args.threshold.unwrap_or(DEFAULT_AUTOMATIC_THRESHOLD),
        batch: args.batch,
    };
    policy.validate()?;

    let interactive = policy.mode == TrainerMode::Manual && !policy.batch;
    let mut console = interactive.then(ConsoleConfirmer::stdio);
    let engine = LearningEngine::new(store);
    Ok(for_each_file(&args.input, |file| {
        let confirmer = console.as_mut().map(|c| c as &mut dyn Confirmer);
        let session = engine.run(&file.headers, &file.records, &erp, &policy, confirmer)?;
        print_session(&file.name(), &session);
        Ok(())
    }))
}

pub fn run_balance(store: &ConfigStore, args: &BalanceArgs) -> Result<BatchOutcome> {
    let erp: ErpSelector = args.erp.parse()?;
    let kb = store.snapshot();
    Ok(for_each_file(&args.input, |file| {
        let check = check_balance(&kb, file, &erp, args.epsilon)?;
        print_balance(&check);
        Ok(())
    }))
}

/// Run `f` on every input file; a failing file does not stop the others.
fn for_each_file<F>(input: &InputArgs, mut f: F) -> BatchOutcome
where
    F: FnMut(&TabularFile) -> Result<()>,
{
    let mut outcome = BatchOutcome::default();
    for path in &input.files {
        let span = info_span!("file", path = %path.display());
        let _guard = span.enter();
        let result = read_table(path, input.delimiter).and_then(|file| {
            info!(headers = file.headers.len(), records = file.records.len(), "processing");
            f(&file)
        });
        outcome.record(path, result);
        println!();
    }
    outcome
}
