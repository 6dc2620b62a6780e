//! Harness configuration.
//!
//! Configuration comes from three layers, highest precedence first: CLI flags
//! (applied by [`crate::cli`]), an optional YAML file, and the defaults below.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::classify::{ExitSentinel, Strategy, Verdict};
use crate::errors::HarnessError;

pub const DEFAULT_CONFIG_FILE: &str = "opcheck.yaml";
pub const DEFAULT_LOG_FILE: &str = "opcheck.log";
pub const DEFAULT_SCRIPTS_DIR: &str = "scripts";
pub const DEFAULT_VERSION_FILE: &str = "VERSION";

/// Exit statuses that can carry a WARN: 0 is PASS, and anything above 255
/// is truncated by the OS.
const SENTINEL_RANGE: std::ops::RangeInclusive<i32> = 1..=255;

/// Everything the harness needs to know before the first operation runs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    pub strategy: Strategy,
    /// `None` means "use the default for the active strategy".
    pub exit_policy: Option<ExitPolicy>,
    pub sentinel: i32,
    pub log_file: PathBuf,
    pub scripts_dir: PathBuf,
    pub version_file: PathBuf,
    pub kill_children_on_interrupt: bool,
    pub keywords: Keywords,
    pub operations: Vec<OperationDecl>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::ExitSentinel,
            exit_policy: None,
            sentinel: ExitSentinel::DEFAULT_SENTINEL,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            scripts_dir: PathBuf::from(DEFAULT_SCRIPTS_DIR),
            version_file: PathBuf::from(DEFAULT_VERSION_FILE),
            kill_children_on_interrupt: true,
            keywords: Keywords::default(),
            operations: Vec::new(),
        }
    }
}

/// Literal keywords used by the content-pattern classifier.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Keywords {
    pub fail: Vec<String>,
    pub warn: Vec<String>,
}

impl Default for Keywords {
    fn default() -> Self {
        Self {
            fail: vec!["fail".to_string(), "error".to_string()],
            warn: vec!["warn".to_string()],
        }
    }
}

/// A built-in operation as declared in the configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OperationDecl {
    /// A script resolved the same way as an explicit identifier.
    Script {
        script: PathBuf,
        #[serde(default)]
        description: Option<String>,
    },
    /// A structured command.
    Command {
        name: String,
        #[serde(default)]
        description: Option<String>,
        program: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        workdir: Option<PathBuf>,
    },
}

impl OperationDecl {
    pub fn name(&self) -> String {
        match self {
            OperationDecl::Script { script, .. } => script.display().to_string(),
            OperationDecl::Command { name, .. } => name.clone(),
        }
    }
}

// ============================================================================
// EXIT POLICY
// ============================================================================

/// How the session verdict maps onto the harness's own exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ExitPolicy {
    /// PASS exits 0, WARN exits with the sentinel, FAIL exits 1.
    Severity,
    /// FAIL exits 1, everything else exits 0.
    FailOnly,
    /// Always exit 0.
    Never,
}

impl ExitPolicy {
    pub fn default_for(strategy: Strategy) -> Self {
        match strategy {
            Strategy::ExitSentinel => ExitPolicy::Severity,
            Strategy::ContentPattern => ExitPolicy::Never,
        }
    }

    pub fn exit_code(self, verdict: Verdict, sentinel: i32) -> i32 {
        match (self, verdict) {
            (ExitPolicy::Never, _) | (_, Verdict::Pass) => 0,
            (ExitPolicy::Severity, Verdict::Warn) => sentinel,
            (ExitPolicy::FailOnly, Verdict::Warn) => 0,
            (_, Verdict::Fail) => 1,
        }
    }
}

// ============================================================================
// LOADING
// ============================================================================

impl HarnessConfig {
    /// Loads `path` if given; otherwise `opcheck.yaml` in the current
    /// directory if it exists; otherwise the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, HarnessError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::from_file(default)?
                } else {
                    Self::default()
                }
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, HarnessError> {
        let text = fs::read_to_string(path).map_err(|source| HarnessError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text).map_err(|source| HarnessError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    /// Rejects a sentinel no process can exit with, and built-in
    /// declarations that can never run.
    pub fn validate(&self) -> Result<(), HarnessError> {
        if !SENTINEL_RANGE.contains(&self.sentinel) {
            return Err(HarnessError::InvalidSentinel(self.sentinel));
        }
        let mut seen = HashSet::new();
        for decl in &self.operations {
            let name = decl.name();
            if let OperationDecl::Command { program, .. } = decl {
                if name.trim().is_empty() {
                    return Err(HarnessError::InvalidOperation {
                        name,
                        reason: "name must not be empty".to_string(),
                    });
                }
                if program.trim().is_empty() {
                    return Err(HarnessError::InvalidOperation {
                        name,
                        reason: "program must not be empty".to_string(),
                    });
                }
            }
            if !seen.insert(name.clone()) {
                return Err(HarnessError::InvalidOperation {
                    name,
                    reason: "declared more than once".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn effective_exit_policy(&self) -> ExitPolicy {
        self.exit_policy
            .unwrap_or_else(|| ExitPolicy::default_for(self.strategy))
    }

    /// Project version string from the version marker file, or `"unknown"`.
    pub fn project_version(&self) -> String {
        fs::read_to_string(&self.version_file)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "unknown".to_string())
    }
}
