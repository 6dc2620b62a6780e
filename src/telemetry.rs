//! Diagnostic tracing.
//!
//! Separate from the session sink: events go to stderr and never reach the
//! session log. Filtered by `OPCHECK_LOG` (an `EnvFilter` directive), `warn`
//! when unset.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_ENV: &str = "OPCHECK_LOG";
const DEFAULT_DIRECTIVE: &str = "warn";

/// Installs the global subscriber. Only the first call takes effect.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .ok();
}
