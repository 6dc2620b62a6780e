//! Console theme.
//!
//! The theme is resolved once at startup from the execution environment and
//! then only ever read. It answers two questions: may we emit colour, and is
//! the console an interactive terminal (which gates the progress indicator
//! and confirmation prompts).

use std::env;
use std::io::Write;

use termcolor::{Ansi, Color, ColorSpec, WriteColor};

use crate::classify::Verdict;

/// Semantic roles a piece of console text can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Pass,
    Warn,
    Fail,
    Skip,
    Banner,
    Detail,
}

impl From<Verdict> for Tag {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Pass => Tag::Pass,
            Verdict::Warn => Tag::Warn,
            Verdict::Fail => Tag::Fail,
        }
    }
}

/// User-facing colour choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

/// Immutable colour/formatting profile for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    color: bool,
    interactive: bool,
}

impl Theme {
    pub fn new(color: bool, interactive: bool) -> Self {
        Self { color, interactive }
    }

    /// Plain, non-interactive theme: no colour, no indicator, no prompts.
    pub fn plain() -> Self {
        Self::new(false, false)
    }

    /// Resolves the theme from the environment.
    ///
    /// `auto` enables colour only on a terminal stdout, and honours
    /// `NO_COLOR` and `TERM=dumb`.
    pub fn resolve(mode: ColorMode) -> Self {
        let interactive = atty::is(atty::Stream::Stdout);
        let color = match mode {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => {
                interactive
                    && env::var_os("NO_COLOR").is_none()
                    && env::var("TERM").map(|t| t != "dumb").unwrap_or(true)
            }
        };
        Self { color, interactive }
    }

    pub fn color(&self) -> bool {
        self.color
    }

    pub fn interactive(&self) -> bool {
        self.interactive
    }

    pub fn spec(tag: Tag) -> ColorSpec {
        let mut spec = ColorSpec::new();
        match tag {
            Tag::Pass => spec.set_fg(Some(Color::Green)),
            Tag::Warn => spec.set_fg(Some(Color::Yellow)),
            Tag::Fail => spec.set_fg(Some(Color::Red)),
            Tag::Skip => spec.set_fg(Some(Color::Cyan)),
            Tag::Banner => spec.set_fg(Some(Color::Green)).set_bold(true),
            Tag::Detail => spec.set_dimmed(true),
        };
        spec
    }

    /// Wraps `text` in the escape codes for `tag`, or returns it unchanged
    /// when colour is off.
    pub fn paint(&self, tag: Tag, text: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        self.paint_spec(&Self::spec(tag), text)
    }

    /// Like [`Theme::paint`], but with the colour of a verdict.
    pub fn paint_verdict(&self, verdict: Verdict, text: &str) -> String {
        self.paint(Tag::from(verdict), text)
    }

    /// Banner colouring follows the session verdict.
    pub fn paint_banner(&self, verdict: Verdict, text: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        let mut spec = Self::spec(Tag::from(verdict));
        spec.set_bold(true);
        self.paint_spec(&spec, text)
    }

    fn paint_spec(&self, spec: &ColorSpec, text: &str) -> String {
        let mut out = Ansi::new(Vec::with_capacity(text.len() + 16));
        // Writes into a Vec cannot fail.
        let _ = out.set_color(spec);
        let _ = out.write_all(text.as_bytes());
        let _ = out.reset();
        String::from_utf8_lossy(&out.into_inner()).into_owned()
    }
}
