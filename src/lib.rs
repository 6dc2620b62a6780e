//! opcheck: run a project's checks in order and report a verdict for each.
//!
//! The pipeline is registry -> harness (runner + classifier) -> session ->
//! reporter -> sink. See [`cli`] for how the pieces are wired together.

pub use crate::classify::{Classifier, Strategy, Verdict};
pub use crate::config::{ExitPolicy, HarnessConfig};
pub use crate::errors::{HarnessError, SkipReason};
pub use crate::session::{OperationResult, RunSession};

// Reporting surface
pub mod report;
pub mod sink;
pub mod theme;

// Operations and their execution
pub mod classify;
pub mod operation;
pub mod progress;
pub mod registry;
pub mod runner;

// Orchestration
pub mod cleanup;
pub mod harness;
pub mod session;

// Ambient
pub mod cli;
pub mod config;
pub mod errors;
pub mod telemetry;
