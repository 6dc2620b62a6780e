//! Operation execution.
//!
//! [`Runner::run`] spawns one operation's command, blocks until it exits, and
//! returns its exit status together with everything it wrote. stdout and
//! stderr share a single temporary capture file so their interleaving is
//! kept. While the child runs, a [`ProgressIndicator`] animates; it is
//! stopped before `run` returns.

use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};
use std::process::Stdio;
use std::time::{Duration, Instant};

use crate::cleanup::Inflight;
use crate::operation::Operation;
use crate::progress::ProgressIndicator;
use crate::theme::{Tag, Theme};

/// Combined stdout/stderr of one execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput(String);

impl CapturedOutput {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the output holds nothing but whitespace.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.0.trim_end().lines()
    }
}

impl From<String> for CapturedOutput {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl fmt::Display for CapturedOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a finished (or failed-to-start) command left behind.
#[derive(Debug, Clone)]
pub struct Execution {
    /// `None` if the child was killed by a signal or never started.
    pub exit_code: Option<i32>,
    pub output: CapturedOutput,
    pub duration: Duration,
}

/// Runs operations one at a time on the calling thread.
pub struct Runner {
    inflight: Inflight,
    theme: Theme,
}

impl Runner {
    pub fn new(inflight: Inflight, theme: Theme) -> Self {
        Self { inflight, theme }
    }

    /// Executes `operation` to completion. Spawn and capture errors are
    /// folded into the returned execution (no exit code, error text as
    /// output) so the caller can classify them like any other failure.
    pub fn run(&self, operation: &Operation) -> Execution {
        let started = Instant::now();
        tracing::debug!(operation = %operation.name, command = %operation.command, "spawning");

        let (exit_code, output) = match self.execute(operation) {
            Ok(done) => done,
            Err(err) => {
                tracing::warn!(operation = %operation.name, error = %err, "execution failed");
                (
                    None,
                    format!("failed to run '{}': {}", operation.command, err),
                )
            }
        };

        let duration = started.elapsed();
        tracing::info!(
            operation = %operation.name,
            exit_code = ?exit_code,
            elapsed_ms = duration.as_millis() as u64,
            "operation finished"
        );
        Execution {
            exit_code,
            output: CapturedOutput::from(output),
            duration,
        }
    }

    fn execute(&self, operation: &Operation) -> io::Result<(Option<i32>, String)> {
        let mut capture = tempfile::tempfile()?;
        let mut command = operation.command.to_command();
        command
            .stdin(Stdio::inherit())
            .stdout(Stdio::from(capture.try_clone()?))
            .stderr(Stdio::from(capture.try_clone()?));

        let mut child = command.spawn()?;
        drop(command);
        self.inflight.set_child(child.id());

        let label = self
            .theme
            .paint(Tag::Warn, &format!("Running {}", operation.description));
        let mut indicator =
            ProgressIndicator::start(&label, self.inflight.indicator(), self.theme.interactive());
        let status = child.wait();
        indicator.stop();
        self.inflight.clear_child();
        let status = status?;

        capture.seek(SeekFrom::Start(0))?;
        let mut bytes = Vec::new();
        capture.read_to_end(&mut bytes)?;
        Ok((status.code(), String::from_utf8_lossy(&bytes).into_owned()))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::operation::CommandSpec;

    fn op(program: &str, args: &[&str]) -> Operation {
        Operation::builtin("t", Some("test op".into()), CommandSpec::new(program).args(args))
    }

    fn runner() -> Runner {
        Runner::new(Inflight::new(), Theme::plain())
    }

    #[test]
    fn captures_stdout_and_exit_code() {
        let exec = runner().run(&op("echo", &["hello"]));
        assert_eq!(exec.exit_code, Some(0));
        assert_eq!(exec.output.as_str(), "hello\n");
    }

    #[test]
    fn interleaves_stdout_and_stderr() {
        let exec = runner().run(&op("sh", &["-c", "echo one; echo two >&2; echo three"]));
        assert_eq!(exec.exit_code, Some(0));
        let lines: Vec<_> = exec.output.lines().collect();
        assert_eq!(lines, vec!["one", "two", "three"]);
    }

    #[test]
    fn reports_nonzero_and_sentinel_exits() {
        assert_eq!(runner().run(&op("sh", &["-c", "exit 1"])).exit_code, Some(1));
        assert_eq!(runner().run(&op("sh", &["-c", "exit 255"])).exit_code, Some(255));
    }

    #[test]
    fn spawn_failure_becomes_output() {
        let exec = runner().run(&op("/definitely/not/a/program", &[]));
        assert_eq!(exec.exit_code, None);
        assert!(exec.output.as_str().contains("failed to run"));
    }

    #[test]
    fn indicator_and_child_are_cleared_after_run() {
        let inflight = Inflight::new();
        let runner = Runner::new(inflight.clone(), Theme::plain());
        runner.run(&op("sh", &["-c", "sleep 0.2"]));
        assert!(!inflight.indicator().is_active());
        assert_eq!(inflight.child(), None);
    }

    #[test]
    fn honours_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("VERSION"), "1.0.0").unwrap();
        let operation = Operation::builtin(
            "version",
            None,
            CommandSpec::new("test").args(["-f", "VERSION"]).current_dir(dir.path()),
        );
        assert_eq!(runner().run(&operation).exit_code, Some(0));
    }
}
