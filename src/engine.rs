// src/engine.rs

//! Wires configuration, providers, the cache, the limiter, the prober and
//! the dispatcher into one session object.

use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::ResponseCache;
use crate::config::EngineConfig;
use crate::dispatch::{Dispatcher, TaskOutcome};
use crate::error::{Result, TranslatorError};
use crate::events::{self, EventReceiver, EventSender};
use crate::provider::{Provider, ProviderCapability};
use crate::rate_limit::FixedWindow;
use crate::resilience::{HealthProber, ProbeReport};

/// A translation session.
///
/// Providers only take part in translations after they passed the most
/// recent probe round; until `probe` has run the active set is empty.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    providers: RwLock<Vec<Provider>>,
    active: RwLock<Vec<Provider>>,
    cache: Arc<ResponseCache>,
    limiter: Arc<FixedWindow>,
    prober: HealthProber,
    dispatcher: Arc<Dispatcher>,
}

impl Engine {
    /// Build an engine serving every configured provider through `adapter`
    pub fn new(
        config: EngineConfig,
        adapter: Arc<dyn ProviderCapability>,
    ) -> Result<(Self, EventReceiver)> {
        let providers = config
            .providers
            .iter()
            .cloned()
            .map(|descriptor| Provider::new(descriptor, Arc::clone(&adapter)))
            .collect();
        Self::with_providers(config, providers)
    }

    /// Build an engine from ready-made providers. Their descriptors replace
    /// the provider list in `config`; disabled ones are left out of every
    /// probe and submission.
    pub fn with_providers(
        mut config: EngineConfig,
        providers: Vec<Provider>,
    ) -> Result<(Self, EventReceiver)> {
        config.providers = providers
            .iter()
            .map(|provider| provider.descriptor().as_ref().clone())
            .collect();
        config.validate()?;
        config.warn_missing_credentials();
        let providers = enabled_only(providers);

        let (events, rx) = events::channel();
        let credentials: Arc<HashMap<String, String>> = Arc::new(
            config
                .credentials
                .iter()
                .filter(|(_, key)| !key.is_empty())
                .map(|(name, key)| (name.clone(), key.clone()))
                .collect(),
        );
        let cache = Arc::new(ResponseCache::new());

        let limiter = Arc::new(FixedWindow::new(config.default_rate_limit));
        for descriptor in &config.providers {
            limiter.configure(&descriptor.name, config.rate_limit_for(descriptor));
        }

        let prober = HealthProber::new(config.probe.clone())
            .with_credentials(Arc::clone(&credentials))
            .with_events(events.clone());
        let dispatcher = Arc::new(Self::build_dispatcher(
            &config,
            Arc::clone(&cache),
            Arc::clone(&limiter),
            credentials,
            events,
        ));

        info!(
            providers = providers.len(),
            default_target = %config.default_target,
            "Engine initialized"
        );

        Ok((
            Self {
                config,
                providers: RwLock::new(providers),
                active: RwLock::new(Vec::new()),
                cache,
                limiter,
                prober,
                dispatcher,
            },
            rx,
        ))
    }

    fn build_dispatcher(
        config: &EngineConfig,
        cache: Arc<ResponseCache>,
        limiter: Arc<FixedWindow>,
        credentials: Arc<HashMap<String, String>>,
        events: EventSender,
    ) -> Dispatcher {
        Dispatcher::new(cache, limiter)
            .with_credentials(credentials)
            .with_retry(config.retry.clone())
            .with_timeouts(config.timeouts.clone())
            .with_events(events)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    pub fn limiter(&self) -> &Arc<FixedWindow> {
        &self.limiter
    }

    /// Probe every configured provider and make the ones answering HTTP
    /// 200 the active set.
    pub async fn probe(&self) -> ProbeReport {
        let providers = self.providers.read().await.clone();
        let report = self.prober.probe_all(&providers).await;

        let active: Vec<Provider> = providers
            .into_iter()
            .filter(|provider| report.is_available(provider.name()))
            .collect();
        if active.is_empty() {
            warn!("No provider passed the availability probe");
        }
        *self.active.write().await = active;
        report
    }

    pub async fn active_providers(&self) -> Vec<Provider> {
        self.active.read().await.clone()
    }

    /// Start one translation task per active provider.
    ///
    /// `target` falls back to the configured default target language.
    pub async fn submit(
        &self,
        text: &str,
        target: Option<&str>,
    ) -> Result<Vec<(String, JoinHandle<TaskOutcome>)>> {
        if text.trim().is_empty() {
            return Err(TranslatorError::EmptyInput);
        }

        let active = self.active_providers().await;
        if active.is_empty() {
            return Err(TranslatorError::NoProviders);
        }

        let target = target.unwrap_or(self.config.default_target.as_str());
        Ok(self.dispatcher.submit(&active, text, target))
    }

    /// Submit and wait for every provider's terminal outcome
    pub async fn translate(&self, text: &str, target: Option<&str>) -> Result<Vec<TaskOutcome>> {
        let handles = self.submit(text, target).await?;

        join_all(handles.into_iter().map(|(name, handle)| async move {
            handle.await.map_err(|err| {
                TranslatorError::Internal(format!("translation task for {} failed: {}", name, err))
            })
        }))
        .await
        .into_iter()
        .collect()
    }

    /// Replace the provider set and probe the new one. Existing rate
    /// windows keep their counts; cached translations are kept.
    pub async fn reconfigure(&self, providers: Vec<Provider>) -> Result<ProbeReport> {
        let mut seen = HashSet::new();
        for provider in &providers {
            if provider.name().is_empty() {
                return Err(TranslatorError::Config(
                    "Provider name must not be empty".to_string(),
                ));
            }
            if !seen.insert(provider.name().to_string()) {
                return Err(TranslatorError::Config(format!(
                    "Duplicate provider name: {}",
                    provider.name()
                )));
            }
        }

        for provider in &providers {
            self.limiter.configure(
                provider.name(),
                self.config.rate_limit_for(provider.descriptor()),
            );
        }

        let providers = enabled_only(providers);
        info!(providers = providers.len(), "Provider set replaced");
        *self.providers.write().await = providers;
        Ok(self.probe().await)
    }
}

fn enabled_only(providers: Vec<Provider>) -> Vec<Provider> {
    providers
        .into_iter()
        .filter(|provider| {
            let enabled = provider.descriptor().enabled;
            if !enabled {
                debug!(provider = provider.name(), "Provider disabled");
            }
            enabled
        })
        .collect()
}
