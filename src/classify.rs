//! Result classification.
//!
//! A finished operation is reduced to a [`Verdict`] by exactly one
//! [`Classifier`] per run. Two strategies exist:
//!
//! - [`ContentPattern`]: exit status first, then failure keywords, then warning
//!   keywords, all matched case-insensitively in the captured output.
//! - [`ExitSentinel`]: the operation reports its own verdict through its exit
//!   status; `0` passes, the sentinel warns, anything else fails.

use std::fmt;

use regex::{Regex, RegexBuilder};
use serde::Deserialize;

use crate::config::HarnessConfig;

// ============================================================================
// VERDICT
// ============================================================================

/// Outcome of one operation. Ordered by severity: `Pass < Warn < Fail`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Verdict {
    Pass,
    Warn,
    Fail,
}

impl Verdict {
    pub fn label(self) -> &'static str {
        match self {
            Verdict::Pass => "PASS",
            Verdict::Warn => "WARN",
            Verdict::Fail => "FAIL",
        }
    }

    /// Most severe verdict of a sequence, or `Pass` for an empty one.
    pub fn worst<I: IntoIterator<Item = Verdict>>(verdicts: I) -> Verdict {
        verdicts.into_iter().max().unwrap_or(Verdict::Pass)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// STRATEGIES
// ============================================================================

/// Turns an (exit status, captured output) pair into a verdict.
///
/// `exit_code` is `None` when the child never produced a status of its own
/// (killed by a signal, or failed to spawn).
pub trait Classifier: Send + Sync {
    fn classify(&self, exit_code: Option<i32>, output: &str) -> Verdict;
}

/// Which classifier a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Exit status plus failure/warning keywords in the output.
    ContentPattern,
    /// Exit status only: 0 passes, the sentinel warns, anything else fails.
    ExitSentinel,
}

impl Strategy {
    pub fn build(self, config: &HarnessConfig) -> Box<dyn Classifier> {
        match self {
            Strategy::ContentPattern => Box::new(ContentPattern::new(
                config.keywords.fail.as_slice(),
                config.keywords.warn.as_slice(),
            )),
            Strategy::ExitSentinel => Box::new(ExitSentinel::new(config.sentinel)),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::ContentPattern => f.write_str("content-pattern"),
            Strategy::ExitSentinel => f.write_str("exit-sentinel"),
        }
    }
}

/// Keyword-driven classification for broad regression sweeps.
#[derive(Debug, Clone)]
pub struct ContentPattern {
    fail: Option<Regex>,
    warn: Option<Regex>,
}

impl ContentPattern {
    /// Keywords are literal substrings, not regular expressions.
    pub fn new<S: AsRef<str>>(fail: &[S], warn: &[S]) -> Self {
        Self {
            fail: keyword_matcher(fail),
            warn: keyword_matcher(warn),
        }
    }
}

impl Default for ContentPattern {
    fn default() -> Self {
        Self::new(&["fail", "error"][..], &["warn"][..])
    }
}

impl Classifier for ContentPattern {
    fn classify(&self, exit_code: Option<i32>, output: &str) -> Verdict {
        if exit_code != Some(0) {
            return Verdict::Fail;
        }
        if self.fail.as_ref().is_some_and(|re| re.is_match(output)) {
            return Verdict::Fail;
        }
        if self.warn.as_ref().is_some_and(|re| re.is_match(output)) {
            return Verdict::Warn;
        }
        Verdict::Pass
    }
}

/// Self-reported verdicts through a reserved exit status.
#[derive(Debug, Clone, Copy)]
pub struct ExitSentinel {
    sentinel: i32,
}

impl ExitSentinel {
    pub const DEFAULT_SENTINEL: i32 = 255;

    pub fn new(sentinel: i32) -> Self {
        Self { sentinel }
    }
}

impl Default for ExitSentinel {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SENTINEL)
    }
}

impl Classifier for ExitSentinel {
    fn classify(&self, exit_code: Option<i32>, _output: &str) -> Verdict {
        match exit_code {
            Some(0) => Verdict::Pass,
            Some(code) if code == self.sentinel => Verdict::Warn,
            _ => Verdict::Fail,
        }
    }
}

fn keyword_matcher<S: AsRef<str>>(keywords: &[S]) -> Option<Regex> {
    let alternation = keywords
        .iter()
        .map(|k| k.as_ref())
        .filter(|k: &&str| !k.is_empty())
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("|");
    if alternation.is_empty() {
        return None;
    }
    // Escaped literals always compile.
    RegexBuilder::new(&alternation)
        .case_insensitive(true)
        .build()
        .ok()
}
