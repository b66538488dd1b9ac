use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use crate::config::ProbeConfig;
use crate::events::{EngineEvent, EventSender, ProbeOutcome};
use crate::probe_event;
use crate::provider::Provider;

/// Outcome of a complete probe round
#[derive(Debug, Clone, Default)]
pub struct ProbeReport {
    /// One outcome per provider, in configuration order
    pub outcomes: Vec<ProbeOutcome>,
    /// Providers that answered HTTP 200, in configuration order
    pub available: Vec<String>,
}

impl ProbeReport {
    pub fn is_available(&self, provider: &str) -> bool {
        self.available.iter().any(|name| name == provider)
    }
}

/// Startup availability probing for the configured providers
#[derive(Debug, Clone)]
pub struct HealthProber {
    /// Configuration for probes
    config: ProbeConfig,
    /// Credentials keyed by provider name
    credentials: Arc<HashMap<String, String>>,
    events: Option<EventSender>,
}

impl HealthProber {
    /// Create a new prober with the given configuration
    pub fn new(config: ProbeConfig) -> Self {
        Self {
            config,
            credentials: Arc::new(HashMap::new()),
            events: None,
        }
    }

    pub fn with_credentials(mut self, credentials: Arc<HashMap<String, String>>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Publish probe progress on `events`
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    fn emit(&self, event: EngineEvent) {
        if let Some(events) = &self.events {
            events.emit(event);
        }
    }

    /// Probe every provider once and wait for all of them.
    ///
    /// Probe `i` starts `i × stagger` after the round begins and is bounded
    /// by its own timeout, so one hanging provider never holds up the
    /// others. Each resolution is published as it happens; the round ends
    /// with a single `ProbingCompleted` event.
    pub async fn probe_all(&self, providers: &[Provider]) -> ProbeReport {
        let total = providers.len();
        info!(total, "Probing providers");
        self.emit(EngineEvent::ProbingStarted {
            providers: providers.iter().map(|p| p.name().to_string()).collect(),
        });

        let mut pending: FuturesUnordered<_> = providers
            .iter()
            .enumerate()
            .map(|(index, provider)| {
                let name = provider.name().to_string();
                let provider = provider.clone();
                let credential = self.credentials.get(&name).cloned();
                let delay = self.config.stagger * index as u32;
                let timeout = self.config.timeout;

                let handle = task::spawn(async move {
                    time::sleep(delay).await;
                    probe_one(index, &provider, credential.as_deref(), timeout).await
                });

                async move {
                    match handle.await {
                        Ok(outcome) => outcome,
                        Err(err) => ProbeOutcome::failed(
                            &name,
                            index,
                            format!("probe task failed: {}", err),
                            Duration::ZERO,
                        ),
                    }
                }
            })
            .collect();

        let mut outcomes = Vec::with_capacity(total);
        while let Some(outcome) = pending.next().await {
            probe_event!(
                outcome.provider.as_str(),
                outcome.status,
                outcome.is_available(),
                outcome.elapsed.as_millis() as u64
            );
            self.emit(EngineEvent::ProbeResolved(outcome.clone()));
            outcomes.push(outcome);
        }

        outcomes.sort_by_key(|outcome| outcome.index);
        let available: Vec<String> = outcomes
            .iter()
            .filter(|outcome| outcome.is_available())
            .map(|outcome| outcome.provider.clone())
            .collect();

        info!(
            available = available.len(),
            total, "Provider probing completed"
        );
        self.emit(EngineEvent::ProbingCompleted {
            available: available.clone(),
            total,
        });

        ProbeReport {
            outcomes,
            available,
        }
    }
}

async fn probe_one(
    index: usize,
    provider: &Provider,
    credential: Option<&str>,
    timeout: Duration,
) -> ProbeOutcome {
    let descriptor = match credential {
        Some(key) => Arc::new(provider.descriptor().with_credential(key)),
        None => Arc::clone(provider.descriptor()),
    };

    debug!(provider = provider.name(), "Probe started");
    let started = Instant::now();
    let result = time::timeout(timeout, provider.adapter().probe(&descriptor)).await;
    let elapsed = started.elapsed();

    match result {
        Ok(Ok(status)) => ProbeOutcome::answered(provider.name(), index, status, elapsed),
        Ok(Err(failure)) => {
            warn!(provider = provider.name(), error = %failure, "Probe failed");
            ProbeOutcome::failed(provider.name(), index, failure.message, elapsed)
        }
        Err(_) => {
            warn!(provider = provider.name(), "Probe timed out after {:?}", timeout);
            ProbeOutcome::failed(
                provider.name(),
                index,
                format!("probe timed out after {:?}", timeout),
                elapsed,
            )
        }
    }
}
