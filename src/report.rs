//! Line-oriented reporting.
//!
//! The reporter formats banners, result lines and captured output, colours
//! them with the run's [`Theme`], and hands every line to an
//! [`OutputSink`]. It holds no state of its own; counts come from the
//! [`RunSession`].

use std::fmt::Display;

use crate::classify::Verdict;
use crate::session::{format_elapsed, OperationResult, RunSession};
use crate::sink::OutputSink;
use crate::theme::{Tag, Theme};

pub const BANNER_WIDTH: usize = 80;
/// Prefix of every captured-output line under a result line.
pub const CONTINUATION: &str = "  -> ";

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct Reporter {
    theme: Theme,
}

impl Reporter {
    pub fn new(theme: Theme) -> Self {
        Self { theme }
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn start_banner(&self, session: &RunSession, sink: &mut dyn OutputSink) {
        let rule = "=".repeat(BANNER_WIDTH);
        let lines = [
            rule.clone(),
            "  Starting operation run".to_string(),
            format!("    Start time: {}", session.started_at().format(TIME_FORMAT)),
            rule,
        ];
        for line in &lines {
            sink.emit(&self.theme.paint(Tag::Banner, line));
        }
    }

    /// One `[VERDICT] description` line, then the captured output.
    pub fn report(&self, result: &OperationResult, sink: &mut dyn OutputSink) {
        let head = format!("[{}] {}", result.verdict, result.description);
        sink.emit(&self.theme.paint_verdict(result.verdict, &head));

        if result.output.is_blank() {
            return;
        }
        // Lines that carry their own verdict tag set the tint for the
        // untagged lines after them.
        let mut tint: Option<Tag> = None;
        for line in result.output.lines().filter(|line| !is_rule(line)) {
            if let Some(tag) = nested_tag(line) {
                tint = Some(tag);
            }
            let text = format!("{}{}", CONTINUATION, line.trim_end());
            match tint {
                Some(tag) => sink.emit(&self.theme.paint(tag, &text)),
                None => sink.emit(&text),
            }
        }
    }

    /// An identifier the registry could not use. Not a result.
    pub fn skipped(&self, id: &str, reason: &dyn Display, sink: &mut dyn OutputSink) {
        let line = format!("[WARN] skipping '{}': {}", id, reason);
        sink.emit(&self.theme.paint(Tag::Warn, &line));
    }

    /// An operation the user chose not to run. Not a result.
    pub fn declined(&self, description: &str, sink: &mut dyn OutputSink) {
        let line = format!("[SKIP] {}", description);
        sink.emit(&self.theme.paint(Tag::Skip, &line));
    }

    pub fn summarize(&self, session: &RunSession, sink: &mut dyn OutputSink) {
        let verdict = session.verdict();
        let tally = session.tally();
        let rule = "=".repeat(BANNER_WIDTH);
        let lines = [
            rule.clone(),
            format!("  {}", headline(verdict)),
            format!("    Total operations : {}", tally.total),
            format!("      Passed         : {}", tally.pass),
            format!("      Warned         : {}", tally.warn),
            format!("      Failed         : {}", tally.fail),
            format!("    End time         : {}", session.finished_at().format(TIME_FORMAT)),
            format!("    Elapsed time     : {}", format_elapsed(session.elapsed())),
            rule,
        ];
        for line in &lines {
            sink.emit(&self.theme.paint_banner(verdict, line));
        }
    }
}

pub fn headline(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Fail => "Run failed: at least one operation reported FAIL.",
        Verdict::Warn => "Run passed with warnings.",
        Verdict::Pass => "All operations passed.",
    }
}

/// Banner rules printed by a nested harness; they only add noise once
/// indented under a result line.
fn is_rule(line: &str) -> bool {
    let line = line.trim();
    line.len() >= 3 && line.chars().all(|c| c == '=')
}

fn nested_tag(line: &str) -> Option<Tag> {
    let line = line.trim_start();
    if line.starts_with("[FAIL]") {
        Some(Tag::Fail)
    } else if line.starts_with("[WARN]") {
        Some(Tag::Warn)
    } else if line.starts_with("[PASS]") {
        Some(Tag::Pass)
    } else {
        None
    }
}
