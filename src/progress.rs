//! Progress indicator.
//!
//! While an operation's child process runs, an `indicatif` spinner ticks
//! after the operation's label. It is owned by one runner call and is always
//! finished and cleared before that call returns.
//!
//! The active spinner also lives in an [`IndicatorSlot`] so that the
//! interrupt handler can clear it. Finishing is idempotent, so whichever side
//! gets there second does nothing.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Time between two spinner frames.
pub const REFRESH_INTERVAL: Duration = Duration::from_millis(100);

const TEMPLATE: &str = "{msg} {spinner}";
const TICK_CHARS: &str = "|/-\\ ";

/// Shared home of the currently running spinner, if any.
#[derive(Clone, Default)]
pub struct IndicatorSlot {
    inner: Arc<Mutex<Option<ProgressBar>>>,
}

impl IndicatorSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.lock().is_some()
    }

    /// Finishes and clears whatever spinner is active. Returns `false` when
    /// there was none.
    pub fn stop_active(&self) -> bool {
        let active = self.lock().take();
        match active {
            Some(bar) => {
                finish(&bar);
                true
            }
            None => false,
        }
    }

    /// Empties the slot if its spinner has already been finished by its owner.
    fn release_finished(&self) {
        let mut guard = self.lock();
        if guard.as_ref().is_some_and(ProgressBar::is_finished) {
            guard.take();
        }
    }

    fn install(&self, bar: ProgressBar) {
        let previous = self.lock().replace(bar);
        if let Some(previous) = previous {
            finish(&previous);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<ProgressBar>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to one running spinner. Dropping it stops the spinner.
pub struct ProgressIndicator {
    bar: ProgressBar,
    slot: IndicatorSlot,
}

impl ProgressIndicator {
    /// Starts a spinner on stdout. Nothing is drawn unless `visible`.
    pub fn start(label: &str, slot: &IndicatorSlot, visible: bool) -> Self {
        let bar = ProgressBar::new_spinner();
        if !visible {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        } else {
            bar.set_draw_target(ProgressDrawTarget::stdout());
        }
        bar.set_style(
            ProgressStyle::default_spinner()
                .template(TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars(TICK_CHARS),
        );
        bar.set_message(label.to_string());
        bar.enable_steady_tick(REFRESH_INTERVAL);

        slot.install(bar.clone());
        Self {
            bar,
            slot: slot.clone(),
        }
    }

    pub fn is_running(&self) -> bool {
        !self.bar.is_finished()
    }

    /// Stops ticking and erases the spinner line. Safe to call more than
    /// once, and after the slot already stopped it.
    pub fn stop(&mut self) {
        finish(&self.bar);
        self.slot.release_finished();
    }
}

impl Drop for ProgressIndicator {
    fn drop(&mut self) {
        self.stop();
    }
}

fn finish(bar: &ProgressBar) {
    if !bar.is_finished() {
        bar.disable_steady_tick();
        bar.finish_and_clear();
    }
}
