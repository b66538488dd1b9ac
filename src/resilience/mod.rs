// src/resilience/mod.rs
//! Resilience features for the translation engine.
//!
//! 1. **Health Probes** - Staggered reachability checks that decide which
//!    providers take part in a session
//! 2. **Retry with Exponential Backoff** - Bounded, visible retries for
//!    transient provider failures

mod exponential_backoff;
mod health_checker;

#[cfg(test)]
mod tests;

// Re-export key components
pub use exponential_backoff::{ExponentialBackoff, RetryConfig};
pub use health_checker::{HealthProber, ProbeReport};
