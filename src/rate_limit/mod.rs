// src/rate_limit/mod.rs

pub mod fixed_window;

#[cfg(test)]
mod tests;

pub use fixed_window::FixedWindow;

use std::fmt::Debug;
use std::time::Duration;

/// Snapshot of one provider's window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitStatus {
    /// Whether a request would be admitted right now
    pub allowed: bool,

    /// Remaining requests in the current window
    pub remaining: u64,

    /// Maximum requests per window
    pub limit: u64,

    /// Time until the current window goes stale
    pub reset_after: Duration,
}

/// Per-provider admission control.
///
/// `allow` never consumes quota; `record_request` and `try_acquire` do,
/// once per issued network call. All methods are non-blocking.
pub trait RateLimitAlgorithm: Send + Sync + Debug {
    /// Checks if a request is allowed without recording it
    fn allow(&self, provider: &str) -> bool;

    /// Records that a request was made
    fn record_request(&self, provider: &str);

    /// Admit and record one request in a single step. Returns `false`
    /// without recording anything when the window is full.
    ///
    /// The default runs `allow` then `record_request`, which leaves a gap
    /// between the two; implementations should override it with one
    /// critical section.
    fn try_acquire(&self, provider: &str) -> bool {
        if !self.allow(provider) {
            return false;
        }
        self.record_request(provider);
        true
    }

    /// Current state of the provider's window
    fn status(&self, provider: &str) -> RateLimitStatus;

    /// Reset the window for a specific provider
    fn reset(&self, provider: &str);
}
