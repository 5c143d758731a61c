#![forbid(unsafe_code)]

//! JSON log output for hosts that embed the form tree.
//!
//! Filtering follows `FORMTREE_LOG` (standard `EnvFilter` directives), falling
//! back to [`DEFAULT_DIRECTIVE`]. Per-node recomputation is logged at `trace`
//! level, so `FORMTREE_LOG=formtree_core=trace` shows every propagation step.

use tracing_subscriber::EnvFilter;

/// Environment variable read by [`try_init_json`].
pub const LOG_ENV: &str = "FORMTREE_LOG";

/// Filter used when [`LOG_ENV`] is unset or unparsable.
pub const DEFAULT_DIRECTIVE: &str = "formtree_core=info";

/// Filter built from [`LOG_ENV`], or [`DEFAULT_DIRECTIVE`].
#[must_use]
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Install a global JSON subscriber.
///
/// Fails if a global subscriber is already set.
pub fn try_init_json() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter())
        .with_current_span(true)
        .try_init()
}
