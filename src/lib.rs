// library entry
pub mod aggregate;
pub mod cache;
pub mod config;
pub mod diagnostics;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod events;
pub mod language;
pub mod logging;
pub mod provider;
pub mod rate_limit;
pub mod resilience;

#[cfg(test)]
mod test_utils;
#[cfg(test)]
mod tests;

// Re-export key components for convenience
pub use aggregate::{Aggregator, Progress, ProviderStatus};
pub use cache::ResponseCache;
pub use config::{EngineConfig, ProviderDescriptor, RateLimitConfig};
pub use diagnostics::{Diagnostic, SuggestionTable};
pub use dispatch::{Dispatcher, TaskOutcome};
pub use engine::Engine;
pub use error::{FailureKind, ProviderFailure, Result, TranslatorError};
pub use events::{EngineEvent, EventReceiver};
pub use logging::init as init_logging;
pub use provider::{HttpProvider, Provider, ProviderCapability, TranslationRequest};
pub use rate_limit::{FixedWindow, RateLimitAlgorithm, RateLimitStatus};
