use rand;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::duration_serde;

/// Configuration for the translation retry strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of calls per task, the first one included
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry
    #[serde(default = "default_initial_backoff", with = "duration_serde")]
    pub initial_backoff: Duration,
    /// Maximum delay between attempts
    #[serde(default = "default_max_backoff", with = "duration_serde")]
    pub max_backoff: Duration,
    /// Multiplier for exponential backoff
    #[serde(default = "default_multiplier")]
    pub backoff_multiplier: f64,
    /// Whether to add jitter to backoff
    #[serde(default = "default_use_jitter")]
    pub use_jitter: bool,
    /// Spend the whole attempt budget on every remote failure, including
    /// classes that are normally terminal (401, 403, unknown).
    ///
    /// Off by default, so a provider rejecting its credential fails after a
    /// single call. When on, that provider fails after exactly
    /// `max_attempts` calls, each preceded by a retry placeholder.
    #[serde(default)]
    pub retry_permanent_failures: bool,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff() -> Duration {
    Duration::from_millis(500)
}

fn default_max_backoff() -> Duration {
    Duration::from_secs(5)
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_use_jitter() -> bool {
    true
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff: default_initial_backoff(),
            max_backoff: default_max_backoff(),
            backoff_multiplier: default_multiplier(),
            use_jitter: default_use_jitter(),
            retry_permanent_failures: false,
        }
    }
}

/// Exponential backoff between translation attempts.
///
/// A task with `max_attempts` calls waits at most `max_attempts - 1` times,
/// so `next_backoff` yields that many delays and then `None`.
#[derive(Debug)]
pub struct ExponentialBackoff {
    /// Number of delays handed out so far
    current_retry: u32,
    /// Configuration for the retry strategy
    config: RetryConfig,
}

impl ExponentialBackoff {
    /// Create a new exponential backoff with the given configuration
    pub fn new(config: RetryConfig) -> Self {
        Self {
            current_retry: 0,
            config,
        }
    }

    /// Get the delay before the next retry, or None if no retries remain
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if self.current_retry + 1 >= self.config.max_attempts {
            return None;
        }
        self.current_retry += 1;

        let exp = self.current_retry as f64 - 1.0;
        let base_ms = self.config.initial_backoff.as_millis() as f64;
        let backoff_ms = base_ms * self.config.backoff_multiplier.powf(exp);
        let max_ms = self.config.max_backoff.as_millis() as f64;
        let capped_ms = backoff_ms.min(max_ms);

        let jittered_ms = if self.config.use_jitter {
            // Add jitter: random value between 50% and 100% of the calculated backoff
            let jitter = rand::random::<f64>() * 0.5 + 0.5;
            (capped_ms * jitter) as u64
        } else {
            capped_ms as u64
        };

        Some(Duration::from_millis(jittered_ms))
    }

    /// Reset the backoff to start from the beginning
    pub fn reset(&mut self) {
        self.current_retry = 0;
    }
}
