//! Run orchestration.
//!
//! [`Harness::run`] walks a [`Selection`] strictly in order: optionally ask
//! for confirmation, run, classify, record, report. Nothing an operation does
//! aborts the session; only an interrupt does, and then the operation that
//! was running is neither recorded nor reported.

use std::io::{self, BufRead, Write};

use crate::classify::Classifier;
use crate::cleanup::Inflight;
use crate::registry::Selection;
use crate::report::Reporter;
use crate::runner::Runner;
use crate::session::{OperationResult, RunSession};
use crate::sink::OutputSink;
use crate::theme::{Tag, Theme};

/// Asks whether an operation should run.
pub trait Prompt {
    fn confirm(&mut self, description: &str) -> bool;
}

/// Asks on stdin. Accepts without asking when stdin is not a terminal.
pub struct StdinPrompt {
    theme: Theme,
}

impl StdinPrompt {
    pub fn new(theme: Theme) -> Self {
        Self { theme }
    }
}

impl Prompt for StdinPrompt {
    fn confirm(&mut self, description: &str) -> bool {
        if !atty::is(atty::Stream::Stdin) {
            return true;
        }
        let question = format!("Run '{}'? [Y/n] ", description);
        let mut stdout = io::stdout();
        let _ = write!(stdout, "{}", self.theme.paint(Tag::Detail, &question));
        let _ = stdout.flush();

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(0) => true,
            Ok(_) => accepts(&answer),
            Err(err) => {
                tracing::warn!(error = %err, "could not read confirmation");
                false
            }
        }
    }
}

/// Empty, `y` and `yes` accept; anything else declines.
pub fn accepts(answer: &str) -> bool {
    matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "" | "y" | "yes"
    )
}

pub struct Harness {
    inflight: Inflight,
    runner: Runner,
    classifier: Box<dyn Classifier>,
    reporter: Reporter,
}

impl Harness {
    pub fn new(inflight: Inflight, theme: Theme, classifier: Box<dyn Classifier>) -> Self {
        Self {
            runner: Runner::new(inflight.clone(), theme),
            inflight,
            classifier,
            reporter: Reporter::new(theme),
        }
    }

    pub fn run(
        &self,
        selection: &Selection,
        quiet: bool,
        sink: &mut dyn OutputSink,
        prompt: &mut dyn Prompt,
    ) -> RunSession {
        let mut session = RunSession::new();
        self.reporter.start_banner(&session, sink);

        for (id, reason) in &selection.skipped {
            self.reporter.skipped(id, reason, sink);
        }

        for operation in &selection.operations {
            if !quiet && !prompt.confirm(&operation.description) {
                tracing::debug!(operation = %operation.name, "declined");
                self.reporter.declined(&operation.description, sink);
                continue;
            }

            let execution = self.runner.run(operation);
            if self.inflight.is_interrupted() {
                // The interrupt handler owns the exit from here on.
                tracing::warn!(operation = %operation.name, "interrupted, result discarded");
                return session;
            }
            let verdict = self
                .classifier
                .classify(execution.exit_code, execution.output.as_str());
            tracing::debug!(operation = %operation.name, %verdict, "classified");

            let result = OperationResult {
                name: operation.name.clone(),
                description: operation.description.clone(),
                exit_code: execution.exit_code,
                verdict,
                output: execution.output,
            };
            self.reporter.report(&result, sink);
            session.record(result);
        }

        session.finish();
        self.reporter.summarize(&session, sink);
        session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{ContentPattern, ExitSentinel, Verdict};
    use crate::errors::SkipReason;
    use crate::operation::{CommandSpec, Operation};
    use crate::session::Tally;
    use crate::sink::OutputBuffer;
    use std::path::PathBuf;

    /// Replays canned answers and records what it was asked.
    struct ScriptedPrompt {
        answers: Vec<bool>,
        asked: Vec<String>,
    }

    impl Prompt for ScriptedPrompt {
        fn confirm(&mut self, description: &str) -> bool {
            self.asked.push(description.to_string());
            if self.answers.is_empty() {
                true
            } else {
                self.answers.remove(0)
            }
        }
    }

    fn scripted(answers: &[bool]) -> ScriptedPrompt {
        ScriptedPrompt {
            answers: answers.to_vec(),
            asked: Vec::new(),
        }
    }

    fn sh(name: &str, script: &str) -> Operation {
        Operation::builtin(name, None, CommandSpec::new("sh").args(["-c", script]))
    }

    fn harness(classifier: Box<dyn Classifier>) -> Harness {
        Harness::new(Inflight::new(), Theme::plain(), classifier)
    }

    fn selection(operations: Vec<Operation>) -> Selection {
        Selection {
            operations,
            ..Selection::default()
        }
    }

    #[test]
    fn accepted_answers() {
        assert!(accepts("\n"));
        assert!(accepts("y\n"));
        assert!(accepts(" YES "));
        assert!(!accepts("n\n"));
        assert!(!accepts("nope"));
    }

    #[cfg(unix)]
    #[test]
    fn content_pattern_session() {
        let plan = selection(vec![
            sh("a", "echo all good"),
            sh("b", "echo 'warning: deprecated'"),
            sh("c", "echo 'ERROR: broken'"),
        ]);
        let mut sink = OutputBuffer::new();
        let session = harness(Box::new(ContentPattern::default())).run(
            &plan,
            true,
            &mut sink,
            &mut scripted(&[]),
        );

        assert_eq!(
            session.tally(),
            Tally {
                pass: 1,
                warn: 1,
                fail: 1,
                total: 3
            }
        );
        assert_eq!(session.verdict(), Verdict::Fail);
        let text = sink.as_str();
        assert!(text.contains("[PASS] a\n  -> all good"));
        assert!(text.contains("[WARN] b\n  -> warning: deprecated"));
        assert!(text.contains("[FAIL] c\n  -> ERROR: broken"));
        assert!(text.contains("Total operations : 3"));
    }

    #[cfg(unix)]
    #[test]
    fn exit_sentinel_session_runs_in_order() {
        let plan = selection(vec![
            sh("first", "exit 255"),
            sh("second", "exit 0"),
            sh("third", "exit 3"),
        ]);
        let mut sink = OutputBuffer::new();
        let session = harness(Box::new(ExitSentinel::default())).run(
            &plan,
            true,
            &mut sink,
            &mut scripted(&[]),
        );

        let verdicts: Vec<_> = session.results().iter().map(|r| r.verdict).collect();
        assert_eq!(verdicts, vec![Verdict::Warn, Verdict::Pass, Verdict::Fail]);
        let names: Vec<_> = session.results().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
        assert_eq!(session.results()[0].exit_code, Some(255));
    }

    #[cfg(unix)]
    #[test]
    fn declined_operations_are_not_counted() {
        let plan = selection(vec![sh("keep", "true"), sh("drop", "true")]);
        let mut sink = OutputBuffer::new();
        let mut prompt = scripted(&[true, false]);
        let session =
            harness(Box::new(ExitSentinel::default())).run(&plan, false, &mut sink, &mut prompt);

        assert_eq!(prompt.asked, vec!["keep", "drop"]);
        assert_eq!(session.tally().total, 1);
        assert!(sink.as_str().contains("[SKIP] drop"));
    }

    #[test]
    fn quiet_runs_never_prompt() {
        let mut prompt = scripted(&[false]);
        let mut sink = OutputBuffer::new();
        let session = harness(Box::new(ExitSentinel::default())).run(
            &selection(Vec::new()),
            true,
            &mut sink,
            &mut prompt,
        );
        assert!(prompt.asked.is_empty());
        assert_eq!(session.tally().total, 0);
        assert_eq!(session.verdict(), Verdict::Pass);
    }

    #[test]
    fn skipped_identifiers_are_reported_but_not_counted() {
        let plan = Selection {
            operations: Vec::new(),
            skipped: vec![(
                "missing.sh".to_string(),
                SkipReason::NotFound(PathBuf::from("scripts/missing.sh")),
            )],
            explicit: true,
        };
        let mut sink = OutputBuffer::new();
        let session = harness(Box::new(ExitSentinel::default())).run(
            &plan,
            true,
            &mut sink,
            &mut scripted(&[]),
        );
        assert_eq!(session.tally().total, 0);
        assert!(sink.as_str().contains("[WARN] skipping 'missing.sh'"));
        assert!(sink.as_str().contains(crate::report::headline(Verdict::Pass)));
    }
}
