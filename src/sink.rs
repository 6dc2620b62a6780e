//! Output sinks.
//!
//! Every line the reporter produces goes through an [`OutputSink`]. The
//! production sink, [`SessionSink`], writes each line to the console exactly
//! as given and appends a colour-stripped copy to the session log.

use std::borrow::Cow;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::HarnessError;

/// Destination for reporter lines.
pub trait OutputSink {
    fn emit(&mut self, line: &str);
}

static ANSI_ESCAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]").expect("static pattern"));

/// Removes terminal escape sequences (colours, line erasure) from `text`.
pub fn strip_ansi(text: &str) -> Cow<'_, str> {
    ANSI_ESCAPE.replace_all(text, "")
}

// ============================================================================
// SESSION SINK: console + append-only log
// ============================================================================

/// Dual-target sink: interactive console plus the session log file.
pub struct SessionSink<W: Write = io::Stdout> {
    console: W,
    log: File,
    log_path: PathBuf,
    log_failures: usize,
}

impl SessionSink<io::Stdout> {
    /// Opens (creating if needed) the session log in append mode.
    pub fn open(log_path: &Path) -> Result<Self, HarnessError> {
        Self::with_console(log_path, io::stdout())
    }
}

impl<W: Write> SessionSink<W> {
    pub fn with_console(log_path: &Path, console: W) -> Result<Self, HarnessError> {
        let open_err = |source| HarnessError::LogOpen {
            path: log_path.to_path_buf(),
            source,
        };
        if let Some(parent) = log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(open_err)?;
        }
        let log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
            .map_err(open_err)?;
        Ok(Self {
            console,
            log,
            log_path: log_path.to_path_buf(),
            log_failures: 0,
        })
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Number of lines that could not be mirrored to the log.
    pub fn log_failures(&self) -> usize {
        self.log_failures
    }

    pub fn into_console(self) -> W {
        self.console
    }
}

impl<W: Write> OutputSink for SessionSink<W> {
    fn emit(&mut self, line: &str) {
        let _ = writeln!(self.console, "{}", line);
        let _ = self.console.flush();

        // Unbuffered: every line is on disk before the next operation starts.
        if let Err(err) = writeln!(self.log, "{}", strip_ansi(line)) {
            self.log_failures += 1;
            tracing::error!(path = %self.log_path.display(), error = %err, "session log write failed");
            eprintln!(
                "[WARN] could not write to session log '{}': {}",
                self.log_path.display(),
                err
            );
        }
    }
}

// ============================================================================
// IN-MEMORY SINK
// ============================================================================

/// In-memory sink; lines are joined with `\n`.
#[derive(Debug, Default)]
pub struct OutputBuffer {
    pub buffer: String,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.buffer.lines()
    }
}

impl OutputSink for OutputBuffer {
    fn emit(&mut self, line: &str) {
        if !self.buffer.is_empty() {
            self.buffer.push('\n');
        }
        self.buffer.push_str(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_color_and_erase_sequences() {
        assert_eq!(strip_ansi("\x1b[0m\x1b[31m[FAIL] x\x1b[0m"), "[FAIL] x");
        assert_eq!(strip_ansi("\r\x1b[2Kdone"), "\rdone");
        assert_eq!(strip_ansi("\x1b[1;32mok"), "ok");
        assert!(matches!(strip_ansi("plain"), Cow::Borrowed("plain")));
    }

    #[test]
    fn session_sink_mirrors_plain_text_to_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("session.log");
        let mut sink = SessionSink::with_console(&path, Vec::new()).unwrap();
        sink.emit("\x1b[32m[PASS] one\x1b[0m");
        sink.emit("  -> detail");
        assert_eq!(sink.log_failures(), 0);

        let console = String::from_utf8(sink.into_console()).unwrap();
        assert!(console.contains("\x1b[32m[PASS] one"));

        let log = fs::read_to_string(&path).unwrap();
        assert_eq!(log, "[PASS] one\n  -> detail\n");
    }

    #[test]
    fn session_sink_appends_to_existing_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.log");
        fs::write(&path, "earlier run\n").unwrap();
        let mut sink = SessionSink::with_console(&path, io::sink()).unwrap();
        sink.emit("later run");
        assert_eq!(fs::read_to_string(&path).unwrap(), "earlier run\nlater run\n");
    }

    #[test]
    fn unopenable_log_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened as the log file.
        let err = SessionSink::with_console(dir.path(), io::sink()).err();
        assert!(matches!(err, Some(HarnessError::LogOpen { .. })));
    }

    #[test]
    fn output_buffer_joins_lines() {
        let mut buf = OutputBuffer::new();
        buf.emit("a");
        buf.emit("b");
        assert_eq!(buf.as_str(), "a\nb");
        assert_eq!(buf.lines().count(), 2);
    }
}
