//! Interrupt handling.
//!
//! A SIGINT/SIGTERM handler is registered once at startup. When it fires it
//! marks the run interrupted, stops the active progress indicator, optionally
//! terminates the in-flight child, and the process exits with status 130.
//! Nothing is written to the session log after the interrupt, so lines
//! already appended stay intact. Normal and error exits are not hooked.

use std::process;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::errors::HarnessError;
use crate::progress::IndicatorSlot;
use crate::theme::{Tag, Theme};

/// Exit status of an interrupted run.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// How long a terminated child may take to exit before the harness stops
/// waiting for it.
pub const TERMINATION_GRACE: Duration = Duration::from_secs(2);
const RELEASE_POLL: Duration = Duration::from_millis(20);

/// State shared between the runner and the interrupt handler: the active
/// indicator, the pid of the running child (0 when none) and whether an
/// interrupt has been received.
#[derive(Clone, Default)]
pub struct Inflight {
    indicator: IndicatorSlot,
    child: Arc<AtomicU32>,
    interrupted: Arc<AtomicBool>,
}

impl Inflight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn indicator(&self) -> &IndicatorSlot {
        &self.indicator
    }

    pub fn set_child(&self, pid: u32) {
        self.child.store(pid, Ordering::SeqCst);
    }

    pub fn clear_child(&self) {
        self.child.store(0, Ordering::SeqCst);
    }

    pub fn child(&self) -> Option<u32> {
        match self.child.load(Ordering::SeqCst) {
            0 => None,
            pid => Some(pid),
        }
    }

    /// Set before the in-flight child is terminated, so a runner woken by
    /// that termination sees it.
    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    fn mark_interrupted(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }
}

/// What the handler did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interruption {
    pub indicator_stopped: bool,
    pub child_terminated: Option<u32>,
}

pub struct CleanupManager;

impl CleanupManager {
    /// Registers the process-wide interrupt handler.
    ///
    /// When the handler terminated an in-flight child, the runner waiting on
    /// that child wakes up, sees the interrupt and leaves through
    /// [`CleanupManager::announce`]. A child that outlives
    /// [`TERMINATION_GRACE`] does not hold the process: the handler exits on
    /// its own once the grace period is over.
    pub fn install(inflight: Inflight, kill_children: bool, theme: Theme) -> Result<(), HarnessError> {
        ctrlc::set_handler(move || {
            let done = Self::on_interrupt(&inflight, kill_children);
            tracing::warn!(?done, "interrupted");
            if done.child_terminated.is_some()
                && Self::await_release(&inflight, TERMINATION_GRACE)
            {
                // The runner announces and exits; this is only a backstop.
                thread::sleep(TERMINATION_GRACE);
            }
            Self::announce(&theme);
            process::exit(INTERRUPTED_EXIT_CODE);
        })
        .map_err(HarnessError::SignalHandler)
    }

    /// Waits until the runner has reaped the in-flight child, or `grace` has
    /// passed. Returns whether the child was released in time.
    pub fn await_release(inflight: &Inflight, grace: Duration) -> bool {
        let deadline = Instant::now() + grace;
        while inflight.child().is_some() {
            if Instant::now() >= deadline {
                tracing::warn!("in-flight operation ignored termination");
                return false;
            }
            thread::sleep(RELEASE_POLL);
        }
        true
    }

    /// Tells the user the run was cut short.
    pub fn announce(theme: &Theme) {
        eprintln!(
            "\n{}",
            theme.paint(Tag::Warn, "[WARN] Interrupted; exiting.")
        );
    }

    /// The handler body minus the final exit.
    pub fn on_interrupt(inflight: &Inflight, kill_children: bool) -> Interruption {
        inflight.mark_interrupted();
        let indicator_stopped = inflight.indicator().stop_active();
        let child_terminated = if kill_children {
            inflight.child().filter(|pid| terminate(*pid))
        } else {
            None
        };
        Interruption {
            indicator_stopped,
            child_terminated,
        }
    }
}

#[cfg(unix)]
fn terminate(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // SAFETY: kill(2) has no memory-safety preconditions.
    unsafe { libc::kill(pid, libc::SIGTERM) == 0 }
}

#[cfg(not(unix))]
fn terminate(_pid: u32) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ProgressIndicator;

    #[test]
    fn interrupt_without_activity_is_noop() {
        let inflight = Inflight::new();
        assert!(!inflight.is_interrupted());
        let done = CleanupManager::on_interrupt(&inflight, true);
        assert_eq!(
            done,
            Interruption {
                indicator_stopped: false,
                child_terminated: None
            }
        );
        assert!(inflight.clone().is_interrupted());
    }

    #[test]
    fn interrupt_stops_active_indicator() {
        let inflight = Inflight::new();
        let mut indicator = ProgressIndicator::start("busy", inflight.indicator(), false);
        let done = CleanupManager::on_interrupt(&inflight, false);
        assert!(done.indicator_stopped);
        assert!(!inflight.indicator().is_active());
        indicator.stop();
    }

    #[cfg(unix)]
    #[test]
    fn interrupt_terminates_registered_child() {
        let inflight = Inflight::new();
        let mut child = std::process::Command::new("sleep").arg("30").spawn().unwrap();
        inflight.set_child(child.id());

        let done = CleanupManager::on_interrupt(&inflight, true);
        assert_eq!(done.child_terminated, Some(child.id()));
        let status = child.wait().unwrap();
        assert_eq!(status.code(), None);
    }

    #[test]
    fn release_wait_is_bounded() {
        let inflight = Inflight::new();
        assert!(CleanupManager::await_release(&inflight, Duration::ZERO));

        inflight.set_child(u32::MAX);
        let started = Instant::now();
        assert!(!CleanupManager::await_release(&inflight, Duration::from_millis(100)));
        assert!(started.elapsed() < Duration::from_secs(2));

        let waiter = inflight.clone();
        let releaser = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            waiter.clear_child();
        });
        assert!(CleanupManager::await_release(&inflight, Duration::from_secs(5)));
        releaser.join().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn child_survives_when_killing_is_disabled() {
        let inflight = Inflight::new();
        let mut child = std::process::Command::new("sleep").arg("30").spawn().unwrap();
        inflight.set_child(child.id());

        let done = CleanupManager::on_interrupt(&inflight, false);
        assert_eq!(done.child_terminated, None);
        assert!(child.try_wait().unwrap().is_none());
        child.kill().unwrap();
        child.wait().unwrap();
    }
}
