//! Command-line arguments for `opcheck`.
//!
//! Declared with `clap`'s derive API. Every option here overrides the
//! corresponding configuration file field; unset options leave it alone.

use clap::Parser;
use std::path::PathBuf;

use crate::classify::Strategy;
use crate::config::{ExitPolicy, HarnessConfig};
use crate::theme::ColorMode;

/// Runs project checks in order and reports a PASS/WARN/FAIL verdict for each.
///
/// With no OPERATION arguments every built-in operation runs, asking before
/// each one. Naming operations runs just those, without asking.
#[derive(Debug, Parser)]
#[command(name = "opcheck", disable_version_flag = true)]
pub struct OpcheckArgs {
    /// Print the project version and exit.
    #[arg(short = 'v', long)]
    pub version: bool,

    /// Never ask for confirmation.
    #[arg(short, long, conflicts_with = "confirm")]
    pub quiet: bool,

    /// Ask for confirmation before each operation, even when naming them.
    #[arg(long)]
    pub confirm: bool,

    /// Session log file.
    #[arg(long, value_name = "PATH")]
    pub logfile: Option<PathBuf>,

    /// Configuration file (defaults to ./opcheck.yaml when present).
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// How operation results are classified.
    #[arg(long, value_enum)]
    pub strategy: Option<Strategy>,

    /// How the overall verdict maps to the exit status.
    #[arg(long, value_enum)]
    pub exit_policy: Option<ExitPolicy>,

    /// Directory searched for operation scripts.
    #[arg(long, value_name = "DIR")]
    pub scripts_dir: Option<PathBuf>,

    /// When to use colour.
    #[arg(long, value_enum, default_value = "auto")]
    pub color: ColorMode,

    /// Operations to run, in order.
    #[arg(value_name = "OPERATION")]
    pub operations: Vec<String>,
}

impl OpcheckArgs {
    /// `Some(true)` for `--quiet`, `Some(false)` for `--confirm`, `None` when
    /// the mode decides.
    pub fn quiet_flag(&self) -> Option<bool> {
        match (self.quiet, self.confirm) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }

    /// Layers the flags that were given over `config`.
    pub fn apply(&self, config: &mut HarnessConfig) {
        if let Some(path) = &self.logfile {
            config.log_file = path.clone();
        }
        if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }
        if let Some(policy) = self.exit_policy {
            config.exit_policy = Some(policy);
        }
        if let Some(dir) = &self.scripts_dir {
            config.scripts_dir = dir.clone();
        }
    }
}
