//! opcheck error types.
//!
//! Two families live here:
//!
//! - [`HarnessError`]: problems that stop the harness before any operation
//!   runs (bad configuration, unwritable log, signal handler registration).
//!   These carry `miette` diagnostics and are rendered once at the CLI edge.
//! - [`SkipReason`]: why an operation identifier was dropped from the plan.
//!   Skips are warnings, never fatal.
//!
//! A failing operation is not an error at all: it becomes a FAIL result.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

// ============================================================================
// FATAL ERRORS
// ============================================================================

/// Errors that abort the harness before the first operation is started.
#[derive(Debug, Error, Diagnostic)]
pub enum HarnessError {
    #[error("could not read configuration file '{}'", path.display())]
    #[diagnostic(
        code(opcheck::config::read),
        help("pass --config <PATH> or remove the option to use built-in defaults")
    )]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration file '{}' is not valid", path.display())]
    #[diagnostic(code(opcheck::config::parse))]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid operation '{name}': {reason}")]
    #[diagnostic(code(opcheck::config::operation))]
    InvalidOperation { name: String, reason: String },

    #[error("sentinel {0} is not a usable exit status")]
    #[diagnostic(
        code(opcheck::config::sentinel),
        help("pick a value between 1 and 255; 0 always means PASS")
    )]
    InvalidSentinel(i32),

    #[error("could not open session log '{}'", path.display())]
    #[diagnostic(
        code(opcheck::log::open),
        help("choose a writable location with --logfile <PATH>")
    )]
    LogOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not install the interrupt handler")]
    #[diagnostic(code(opcheck::signal))]
    SignalHandler(#[source] ctrlc::Error),
}

impl HarnessError {
    /// Process exit status used when this error stops the harness.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

// ============================================================================
// REGISTRY SKIPS
// ============================================================================

/// Why an operation identifier could not be turned into a runnable operation.
#[derive(Debug, Error)]
pub enum SkipReason {
    #[error("operation not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("not a regular file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("cannot read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no invocation marker (#!) on the first line of {}", .0.display())]
    NoInvocationMarker(PathBuf),
}
