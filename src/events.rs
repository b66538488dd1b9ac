// src/events.rs

//! Immutable events flowing from probes and translation tasks to the
//! aggregator. Producers never touch display state directly.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::trace;
use uuid::Uuid;

use crate::diagnostics::Diagnostic;
use crate::error::ProviderFailure;

/// Result of probing one provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeOutcome {
    pub provider: String,
    /// Position in the configured provider list
    pub index: usize,
    /// HTTP status, if the provider answered
    pub status: Option<u16>,
    pub error: Option<String>,
    pub elapsed: Duration,
    pub checked_at: DateTime<Utc>,
}

impl ProbeOutcome {
    pub fn answered(provider: &str, index: usize, status: u16, elapsed: Duration) -> Self {
        Self {
            provider: provider.to_string(),
            index,
            status: Some(status),
            error: None,
            elapsed,
            checked_at: Utc::now(),
        }
    }

    pub fn failed(provider: &str, index: usize, error: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            provider: provider.to_string(),
            index,
            status: None,
            error: Some(error.into()),
            elapsed,
            checked_at: Utc::now(),
        }
    }

    /// Only an HTTP 200 makes a provider available
    pub fn is_available(&self) -> bool {
        self.status == Some(200)
    }
}

#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A probe round started for these providers
    ProbingStarted { providers: Vec<String> },

    /// One probe resolved, in completion order
    ProbeResolved(ProbeOutcome),

    /// Every probe of the round has resolved
    ProbingCompleted { available: Vec<String>, total: usize },

    /// A translation task was created for a provider
    TaskDispatched { task_id: Uuid, provider: String },

    /// A network call is about to be issued
    AttemptStarted {
        task_id: Uuid,
        provider: String,
        attempt: u32,
        max_attempts: u32,
    },

    /// The last call failed and another one will follow after `delay`
    RetryScheduled {
        task_id: Uuid,
        provider: String,
        next_attempt: u32,
        max_attempts: u32,
        delay: Duration,
        failure: ProviderFailure,
    },

    TranslationSucceeded {
        task_id: Uuid,
        provider: String,
        text: String,
        /// Network calls made; zero for a cache hit
        attempts: u32,
        from_cache: bool,
    },

    TranslationFailed {
        task_id: Uuid,
        provider: String,
        diagnostic: Diagnostic,
        attempts: u32,
    },
}

impl EngineEvent {
    /// Provider the event concerns, if it concerns a single one
    pub fn provider(&self) -> Option<&str> {
        match self {
            EngineEvent::ProbingStarted { .. } | EngineEvent::ProbingCompleted { .. } => None,
            EngineEvent::ProbeResolved(outcome) => Some(&outcome.provider),
            EngineEvent::TaskDispatched { provider, .. }
            | EngineEvent::AttemptStarted { provider, .. }
            | EngineEvent::RetryScheduled { provider, .. }
            | EngineEvent::TranslationSucceeded { provider, .. }
            | EngineEvent::TranslationFailed { provider, .. } => Some(provider),
        }
    }

    /// Whether this event ends a translation task
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EngineEvent::TranslationSucceeded { .. } | EngineEvent::TranslationFailed { .. }
        )
    }
}

pub type EventReceiver = mpsc::UnboundedReceiver<EngineEvent>;

/// Cloneable handle producers use to publish events.
#[derive(Debug, Clone)]
pub struct EventSender {
    inner: mpsc::UnboundedSender<EngineEvent>,
}

impl EventSender {
    /// Publish an event. A dropped receiver only means nobody is watching,
    /// so the event is discarded.
    pub fn emit(&self, event: EngineEvent) {
        if let Err(err) = self.inner.send(event) {
            trace!(event = ?err.0, "Event receiver dropped");
        }
    }
}

pub fn channel() -> (EventSender, EventReceiver) {
    let (inner, rx) = mpsc::unbounded_channel();
    (EventSender { inner }, rx)
}
