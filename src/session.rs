//! Run session and aggregation.

use std::time::{Duration, Instant};

use chrono::{DateTime, Local};

use crate::classify::Verdict;
use crate::runner::CapturedOutput;

/// The classified outcome of one operation.
#[derive(Debug, Clone)]
pub struct OperationResult {
    pub name: String,
    pub description: String,
    pub exit_code: Option<i32>,
    pub verdict: Verdict,
    pub output: CapturedOutput,
}

/// Per-verdict counters. `total == pass + warn + fail` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub pass: usize,
    pub warn: usize,
    pub fail: usize,
    pub total: usize,
}

impl Tally {
    pub fn record(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::Pass => self.pass += 1,
            Verdict::Warn => self.warn += 1,
            Verdict::Fail => self.fail += 1,
        }
        self.total += 1;
    }

    pub fn verdict(&self) -> Verdict {
        if self.fail > 0 {
            Verdict::Fail
        } else if self.warn > 0 {
            Verdict::Warn
        } else {
            Verdict::Pass
        }
    }
}

/// One harness invocation: results in execution order plus counters.
#[derive(Debug, Clone)]
pub struct RunSession {
    results: Vec<OperationResult>,
    tally: Tally,
    started_at: DateTime<Local>,
    started: Instant,
    finished: Option<(DateTime<Local>, Duration)>,
}

impl Default for RunSession {
    fn default() -> Self {
        Self::new()
    }
}

impl RunSession {
    pub fn new() -> Self {
        Self {
            results: Vec::new(),
            tally: Tally::default(),
            started_at: Local::now(),
            started: Instant::now(),
            finished: None,
        }
    }

    pub fn record(&mut self, result: OperationResult) {
        self.tally.record(result.verdict);
        self.results.push(result);
        debug_assert_eq!(
            self.tally.total,
            self.tally.pass + self.tally.warn + self.tally.fail
        );
    }

    /// Stamps the end time. Later calls keep the first stamp.
    pub fn finish(&mut self) {
        if self.finished.is_none() {
            self.finished = Some((Local::now(), self.started.elapsed()));
        }
    }

    pub fn results(&self) -> &[OperationResult] {
        &self.results
    }

    pub fn tally(&self) -> Tally {
        self.tally
    }

    pub fn verdict(&self) -> Verdict {
        self.tally.verdict()
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Local> {
        self.finished.map(|(at, _)| at).unwrap_or_else(Local::now)
    }

    pub fn elapsed(&self) -> Duration {
        self.finished
            .map(|(_, elapsed)| elapsed)
            .unwrap_or_else(|| self.started.elapsed())
    }
}

/// `{minutes}m {seconds}s`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}m {}s", secs / 60, secs % 60)
}
