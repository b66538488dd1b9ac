// src/aggregate.rs

//! Folds engine events into the per-provider view the presentation layer
//! renders. The aggregator is the only writer of provider status.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tokio::sync::mpsc::error::TryRecvError;

use crate::events::{EngineEvent, EventReceiver, ProbeOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    Idle,
    Probing,
    Available,
    Unavailable,
    Translating,
    Retrying,
    Succeeded,
    Failed,
}

impl fmt::Display for ProviderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderStatus::Idle => "idle",
            ProviderStatus::Probing => "probing",
            ProviderStatus::Available => "available",
            ProviderStatus::Unavailable => "unavailable",
            ProviderStatus::Translating => "translating",
            ProviderStatus::Retrying => "retrying",
            ProviderStatus::Succeeded => "succeeded",
            ProviderStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderView {
    pub status: ProviderStatus,
    /// Text shown in the provider's slot
    pub display: String,
    /// Network calls made by the latest task
    pub attempts: u32,
    pub updated_at: DateTime<Utc>,
}

impl Default for ProviderView {
    fn default() -> Self {
        Self {
            status: ProviderStatus::Idle,
            display: String::new(),
            attempts: 0,
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub probes_resolved: usize,
    pub probes_total: usize,
    pub translations_completed: usize,
    pub translations_dispatched: usize,
}

/// Placeholder shown while a task waits for its next attempt
pub fn retry_placeholder(attempt: u32, max_attempts: u32) -> String {
    format!("Retrying... (attempt {}/{})", attempt, max_attempts)
}

fn probe_display(outcome: &ProbeOutcome) -> String {
    let elapsed_ms = outcome.elapsed.as_millis();
    match (outcome.status, &outcome.error) {
        (Some(200), _) => format!("Available ({} ms)", elapsed_ms),
        (Some(status), _) => format!("Unavailable (HTTP {})", status),
        (None, Some(error)) => format!("Unavailable: {}", error),
        (None, None) => "Unavailable".to_string(),
    }
}

/// Race-free view over out-of-order probe and translation events.
#[derive(Debug, Default)]
pub struct Aggregator {
    views: HashMap<String, ProviderView>,
    /// Providers in first-seen order
    order: Vec<String>,
    /// Append-only
    available: Vec<String>,
    progress: Progress,
    probing_complete: bool,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    fn update(&mut self, provider: &str, apply: impl FnOnce(&mut ProviderView)) {
        if !self.views.contains_key(provider) {
            self.order.push(provider.to_string());
        }
        let view = self.views.entry(provider.to_string()).or_default();
        apply(view);
        view.updated_at = Utc::now();
    }

    fn mark_available(&mut self, provider: &str) {
        if !self.available.iter().any(|name| name == provider) {
            self.available.push(provider.to_string());
        }
    }

    pub fn apply(&mut self, event: &EngineEvent) {
        match event {
            EngineEvent::ProbingStarted { providers } => {
                self.probing_complete = false;
                self.progress.probes_resolved = 0;
                self.progress.probes_total = providers.len();
                for provider in providers {
                    self.update(provider, |view| {
                        view.status = ProviderStatus::Probing;
                        view.display = "Checking availability...".to_string();
                    });
                }
            }
            EngineEvent::ProbeResolved(outcome) => {
                self.progress.probes_resolved += 1;
                let available = outcome.is_available();
                if available {
                    self.mark_available(&outcome.provider);
                }
                self.update(&outcome.provider, |view| {
                    view.status = if available {
                        ProviderStatus::Available
                    } else {
                        ProviderStatus::Unavailable
                    };
                    view.display = probe_display(outcome);
                });
            }
            EngineEvent::ProbingCompleted { available, .. } => {
                for provider in available {
                    self.mark_available(provider);
                }
                self.probing_complete = true;
            }
            EngineEvent::TaskDispatched { provider, .. } => {
                self.progress.translations_dispatched += 1;
                self.update(provider, |view| {
                    view.status = ProviderStatus::Translating;
                    view.display = "Translating...".to_string();
                    view.attempts = 0;
                });
            }
            EngineEvent::AttemptStarted {
                provider, attempt, ..
            } => {
                let attempt = *attempt;
                self.update(provider, |view| {
                    view.status = ProviderStatus::Translating;
                    view.attempts = attempt;
                    // a retry keeps its placeholder until the call resolves
                    if attempt <= 1 {
                        view.display = "Translating...".to_string();
                    }
                });
            }
            EngineEvent::RetryScheduled {
                provider,
                next_attempt,
                max_attempts,
                ..
            } => {
                let display = retry_placeholder(*next_attempt, *max_attempts);
                self.update(provider, |view| {
                    view.status = ProviderStatus::Retrying;
                    view.display = display;
                });
            }
            EngineEvent::TranslationSucceeded {
                provider,
                text,
                attempts,
                ..
            } => {
                self.progress.translations_completed += 1;
                self.update(provider, |view| {
                    view.status = ProviderStatus::Succeeded;
                    view.display = text.clone();
                    view.attempts = *attempts;
                });
            }
            EngineEvent::TranslationFailed {
                provider,
                diagnostic,
                attempts,
                ..
            } => {
                self.progress.translations_completed += 1;
                self.update(provider, |view| {
                    view.status = ProviderStatus::Failed;
                    view.display = diagnostic.to_string();
                    view.attempts = *attempts;
                });
            }
        }
    }

    /// Apply every event already queued on `rx` without waiting.
    /// Returns the number applied.
    pub fn drain(&mut self, rx: &mut EventReceiver) -> usize {
        let mut applied = 0;
        loop {
            match rx.try_recv() {
                Ok(event) => {
                    self.apply(&event);
                    applied += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        applied
    }

    pub fn status(&self, provider: &str) -> ProviderStatus {
        self.views
            .get(provider)
            .map(|view| view.status)
            .unwrap_or(ProviderStatus::Idle)
    }

    pub fn display(&self, provider: &str) -> Option<&str> {
        self.views.get(provider).map(|view| view.display.as_str())
    }

    pub fn view(&self, provider: &str) -> Option<&ProviderView> {
        self.views.get(provider)
    }

    /// Known providers in the order they first appeared
    pub fn providers(&self) -> &[String] {
        &self.order
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub fn available_providers(&self) -> &[String] {
        &self.available
    }

    pub fn is_probing_complete(&self) -> bool {
        self.probing_complete
    }

    /// Every dispatched task has reached a terminal state
    pub fn is_translation_complete(&self) -> bool {
        self.progress.translations_completed >= self.progress.translations_dispatched
    }
}
