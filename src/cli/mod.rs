//! The `opcheck` command-line interface.
//!
//! Wires configuration, theme, session sink, interrupt handling, selection
//! and the harness together, and turns the session verdict into the process
//! exit status.

use std::process;

use clap::Parser;

use crate::cleanup::{CleanupManager, Inflight, INTERRUPTED_EXIT_CODE};
use crate::cli::args::OpcheckArgs;
use crate::config::HarnessConfig;
use crate::errors::HarnessError;
use crate::harness::{Harness, StdinPrompt};
use crate::registry::Registry;
use crate::sink::SessionSink;
use crate::telemetry;
use crate::theme::Theme;

pub mod args;

/// Parses the process arguments, runs, and exits.
pub fn run() {
    let args = OpcheckArgs::parse();
    process::exit(execute(args));
}

/// Runs with already-parsed arguments and returns the exit status.
pub fn execute(args: OpcheckArgs) -> i32 {
    telemetry::init_tracing();

    if args.version {
        let config = HarnessConfig::load(args.config.as_deref()).unwrap_or_default();
        println!("{}", config.project_version());
        return 0;
    }

    match run_session(&args) {
        Ok(code) => code,
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            code
        }
    }
}

fn run_session(args: &OpcheckArgs) -> Result<i32, HarnessError> {
    let mut config = HarnessConfig::load(args.config.as_deref())?;
    args.apply(&mut config);
    tracing::debug!(?config, "configuration resolved");

    let theme = Theme::resolve(args.color);
    let mut sink = SessionSink::open(&config.log_file)?;

    let inflight = Inflight::new();
    CleanupManager::install(inflight.clone(), config.kill_children_on_interrupt, theme)?;

    let selection = Registry::new(&config).select(&args.operations);
    let quiet = selection.quiet(args.quiet_flag());

    let harness = Harness::new(inflight.clone(), theme, config.strategy.build(&config));
    let session = harness.run(&selection, quiet, &mut sink, &mut StdinPrompt::new(theme));
    if inflight.is_interrupted() {
        CleanupManager::announce(&theme);
        return Ok(INTERRUPTED_EXIT_CODE);
    }

    let policy = config.effective_exit_policy();
    let code = policy.exit_code(session.verdict(), config.sentinel);
    tracing::info!(verdict = %session.verdict(), ?policy, code, "run complete");
    Ok(code)
}
