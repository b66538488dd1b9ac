use std::sync::Once;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// Ensure initialization happens only once
static INIT: Once = Once::new();

/// Initialize the logging system with sensible defaults.
///
/// Log level can be set using the RUST_LOG environment variable.
/// Example: RUST_LOG=debug,multi_translator=trace
pub fn init() {
    init_with_default("info");
}

/// Same as [`init`] but with a caller-chosen fallback filter for when
/// RUST_LOG is unset. Logs go to stderr.
pub fn init_with_default(default_filter: &str) {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

        let installed = tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true) // Include module path in logs
                    .with_thread_ids(true) // Useful for debugging concurrency issues
                    .with_line_number(true),
            )
            .try_init();

        // Another global subscriber already owns the process
        if installed.is_ok() {
            tracing::debug!("Logging initialized");
        }
    });
}

/// Macro for logging translation attempt outcomes
#[macro_export]
macro_rules! translation_event {
    ($task_id:expr, $provider:expr, $attempt:expr, $max_attempts:expr, $outcome:expr) => {
        tracing::info!(
            task_id = %$task_id,
            provider = $provider,
            attempt = $attempt,
            max_attempts = $max_attempts,
            outcome = $outcome,
            "Translation attempt"
        )
    };
}

/// Macro for logging probe resolutions with timing
#[macro_export]
macro_rules! probe_event {
    ($provider:expr, $status:expr, $available:expr, $elapsed_ms:expr) => {
        tracing::info!(
            provider = $provider,
            status = ?$status,
            available = $available,
            elapsed_ms = $elapsed_ms,
            "Probe resolved"
        )
    };
}
