// src/dispatch/mod.rs

//! Runs one translation task per provider: cache, admission, invocation
//! and bounded retries, publishing every step as an event.

mod task;

pub use task::{RetryState, TaskOutcome, TaskState, TranslationTask};

use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info, warn};

use crate::cache::ResponseCache;
use crate::config::{ProviderDescriptor, TimeoutPolicy};
use crate::diagnostics::SuggestionTable;
use crate::error::{FailureKind, ProviderFailure};
use crate::events::{EngineEvent, EventSender};
use crate::language;
use crate::provider::{Provider, TranslationRequest};
use crate::rate_limit::RateLimitAlgorithm;
use crate::resilience::{ExponentialBackoff, RetryConfig};
use crate::translation_event;

/// Retry-aware task runner shared by all submissions.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    cache: Arc<ResponseCache>,
    limiter: Arc<dyn RateLimitAlgorithm>,
    /// Credentials keyed by provider name
    credentials: Arc<HashMap<String, String>>,
    retry: RetryConfig,
    timeouts: TimeoutPolicy,
    suggestions: Arc<SuggestionTable>,
    events: Option<EventSender>,
}

impl Dispatcher {
    pub fn new(cache: Arc<ResponseCache>, limiter: Arc<dyn RateLimitAlgorithm>) -> Self {
        Self {
            cache,
            limiter,
            credentials: Arc::new(HashMap::new()),
            retry: RetryConfig::default(),
            timeouts: TimeoutPolicy::default(),
            suggestions: Arc::new(SuggestionTable::default()),
            events: None,
        }
    }

    pub fn with_credentials(mut self, credentials: Arc<HashMap<String, String>>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeouts(mut self, timeouts: TimeoutPolicy) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_suggestions(mut self, suggestions: SuggestionTable) -> Self {
        self.suggestions = Arc::new(suggestions);
        self
    }

    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    fn emit(&self, event: EngineEvent) {
        if let Some(events) = &self.events {
            events.emit(event);
        }
    }

    /// Spawn one task per provider. Each handle resolves to that
    /// provider's terminal outcome; outcomes also arrive as events.
    pub fn submit(
        self: &Arc<Self>,
        providers: &[Provider],
        text: &str,
        selected_target: &str,
    ) -> Vec<(String, JoinHandle<TaskOutcome>)> {
        providers
            .iter()
            .map(|provider| {
                let dispatcher = Arc::clone(self);
                let provider = provider.clone();
                let text = text.to_string();
                let target = selected_target.to_string();
                let name = provider.name().to_string();

                let handle = tokio::spawn(async move {
                    dispatcher.dispatch(&provider, &text, &target).await
                });
                (name, handle)
            })
            .collect()
    }

    /// Run a single task to completion. Failures end up in the returned
    /// outcome; nothing here panics or returns an error.
    pub async fn dispatch(
        &self,
        provider: &Provider,
        text: &str,
        selected_target: &str,
    ) -> TaskOutcome {
        let resolved = language::resolve(text, selected_target);
        let (source, target) = match &resolved {
            Ok(pair) => (pair.source.clone(), pair.target.clone()),
            Err(conflict) => (conflict.language.clone(), conflict.language.clone()),
        };

        let mut task = TranslationTask::new(
            Arc::clone(provider.descriptor()),
            text,
            &source,
            &target,
            self.retry.max_attempts,
        );
        info!(
            task_id = %task.id,
            provider = task.provider(),
            source = %task.source,
            target = %task.target,
            "Dispatching translation"
        );
        self.emit(EngineEvent::TaskDispatched {
            task_id: task.id,
            provider: task.provider().to_string(),
        });

        if let Err(conflict) = resolved {
            let failure = ProviderFailure::new(
                task.provider(),
                FailureKind::LanguageConflict,
                format!(
                    "Source and target language are both '{}'",
                    conflict.language
                ),
            );
            return self.fail(&mut task, failure);
        }

        if let Some(cached) = self
            .cache
            .get(task.provider(), &task.text, &task.source, &task.target)
        {
            debug!(task_id = %task.id, provider = task.provider(), "Cache hit");
            return self.succeed(&mut task, cached, true);
        }

        self.run(provider, &mut task).await
    }

    /// Admission, invocation and retries for a task that missed the cache
    async fn run(&self, provider: &Provider, task: &mut TranslationTask) -> TaskOutcome {
        let name = task.provider().to_string();
        let descriptor = match self.credentials.get(&name) {
            Some(key) => Arc::new(task.descriptor.with_credential(key)),
            None => Arc::clone(&task.descriptor),
        };
        let request = TranslationRequest {
            text: task.text.clone(),
            source: task.source.clone(),
            target: task.target.clone(),
        };
        let timeout = self.timeouts.for_text(&task.text);
        let mut backoff = ExponentialBackoff::new(self.retry.clone());

        loop {
            if !self.limiter.try_acquire(&name) {
                return self.fail(task, ProviderFailure::rate_limited(&name));
            }

            task.transition(TaskState::InFlight);
            let attempt = task.retry.begin_attempt();
            let max_attempts = task.retry.max_attempts;
            self.emit(EngineEvent::AttemptStarted {
                task_id: task.id,
                provider: name.clone(),
                attempt,
                max_attempts,
            });

            let result =
                match time::timeout(timeout, provider.adapter().translate(&descriptor, &request))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(ProviderFailure::timeout(&name, timeout)),
                };

            let failure = match result {
                Ok(translated) => {
                    translation_event!(task.id, name.as_str(), attempt, max_attempts, "success");
                    self.cache.set(
                        &name,
                        &task.text,
                        &task.source,
                        &task.target,
                        &translated,
                    );
                    return self.succeed(task, translated, false);
                }
                Err(failure) => failure,
            };

            translation_event!(
                task.id,
                name.as_str(),
                attempt,
                max_attempts,
                failure.kind.code()
            );

            if !self.should_retry(&failure, &task.descriptor) || !task.retry.has_remaining() {
                return self.fail(task, failure);
            }
            let Some(delay) = backoff.next_backoff() else {
                return self.fail(task, failure);
            };

            task.transition(TaskState::RetryScheduled);
            info!(
                task_id = %task.id,
                provider = %name,
                next_attempt = attempt + 1,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %failure,
                "Retrying translation"
            );
            self.emit(EngineEvent::RetryScheduled {
                task_id: task.id,
                provider: name.clone(),
                next_attempt: attempt + 1,
                max_attempts,
                delay,
                failure,
            });
            time::sleep(delay).await;
        }
    }

    fn should_retry(&self, failure: &ProviderFailure, descriptor: &ProviderDescriptor) -> bool {
        if failure.kind.is_local() {
            return false;
        }
        self.retry.retry_permanent_failures || failure.kind.is_retryable(descriptor.retry_not_found)
    }

    fn succeed(&self, task: &mut TranslationTask, text: String, from_cache: bool) -> TaskOutcome {
        let attempts = task.retry.attempt;
        task.transition(TaskState::Succeeded);

        self.emit(EngineEvent::TranslationSucceeded {
            task_id: task.id,
            provider: task.provider().to_string(),
            text: text.clone(),
            attempts,
            from_cache,
        });
        TaskOutcome::Succeeded {
            task_id: task.id,
            provider: task.provider().to_string(),
            text,
            attempts,
            from_cache,
        }
    }

    fn fail(&self, task: &mut TranslationTask, failure: ProviderFailure) -> TaskOutcome {
        let attempts = task.retry.attempt;
        // local rate limiting clears up by itself once the window rolls over
        let transient = failure.kind == FailureKind::RateLimitExceeded
            || failure.kind.is_retryable(task.descriptor.retry_not_found);
        let diagnostic = self.suggestions.diagnose(&failure, transient);

        warn!(
            task_id = %task.id,
            provider = task.provider(),
            kind = failure.kind.code(),
            attempts,
            error = %failure,
            "Translation failed"
        );
        task.transition(TaskState::Failed);

        self.emit(EngineEvent::TranslationFailed {
            task_id: task.id,
            provider: task.provider().to_string(),
            diagnostic: diagnostic.clone(),
            attempts,
        });
        TaskOutcome::Failed {
            task_id: task.id,
            provider: task.provider().to_string(),
            diagnostic,
            attempts,
        }
    }
}
