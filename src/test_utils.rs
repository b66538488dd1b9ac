// src/test_utils.rs

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time;

use crate::config::{HttpMethod, ProviderDescriptor};
use crate::error::{FailureKind, ProviderFailure};
use crate::events::{EngineEvent, EventReceiver};
use crate::provider::{Provider, ProviderCapability, TranslationRequest};
use crate::resilience::RetryConfig;

/// What a mock translation call does
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    Fail(FailureKind),
    /// Sleep, then answer with the text
    Stall(Duration, String),
}

/// Scripted provider capability. Scripted replies are consumed in order,
/// then the fallback answers every further call.
#[derive(Debug)]
pub struct MockProvider {
    script: Mutex<VecDeque<MockReply>>,
    fallback: MockReply,
    probe_reply: Result<u16, FailureKind>,
    probe_delay: Duration,
    translate_calls: AtomicUsize,
    probe_calls: AtomicUsize,
    seen: Mutex<Vec<(ProviderDescriptor, TranslationRequest)>>,
    probed: Mutex<Vec<ProviderDescriptor>>,
}

impl MockProvider {
    pub fn new(translation: &str) -> Self {
        Self::with_fallback(MockReply::Text(translation.to_string()))
    }

    /// Every call fails with `kind`
    pub fn failing(kind: FailureKind) -> Self {
        Self::with_fallback(MockReply::Fail(kind))
    }

    pub fn with_fallback(fallback: MockReply) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            probe_reply: Ok(200),
            probe_delay: Duration::ZERO,
            translate_calls: AtomicUsize::new(0),
            probe_calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            probed: Mutex::new(Vec::new()),
        }
    }

    /// Queue a reply ahead of the fallback
    pub fn then(self, reply: MockReply) -> Self {
        self.script.lock().unwrap().push_back(reply);
        self
    }

    pub fn with_probe_status(mut self, status: u16) -> Self {
        self.probe_reply = Ok(status);
        self
    }

    pub fn with_probe_failure(mut self, kind: FailureKind) -> Self {
        self.probe_reply = Err(kind);
        self
    }

    pub fn with_probe_delay(mut self, delay: Duration) -> Self {
        self.probe_delay = delay;
        self
    }

    pub fn translate_calls(&self) -> usize {
        self.translate_calls.load(Ordering::SeqCst)
    }

    pub fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    /// Descriptors and requests passed to `translate`, in call order
    pub fn requests(&self) -> Vec<(ProviderDescriptor, TranslationRequest)> {
        self.seen.lock().unwrap().clone()
    }

    /// Descriptors passed to `probe`, in call order
    pub fn probed(&self) -> Vec<ProviderDescriptor> {
        self.probed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProviderCapability for MockProvider {
    async fn probe(&self, descriptor: &ProviderDescriptor) -> Result<u16, ProviderFailure> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        self.probed.lock().unwrap().push(descriptor.clone());
        if !self.probe_delay.is_zero() {
            time::sleep(self.probe_delay).await;
        }
        self.probe_reply
            .map_err(|kind| failure_for(&descriptor.name, kind))
    }

    async fn translate(
        &self,
        descriptor: &ProviderDescriptor,
        request: &TranslationRequest,
    ) -> Result<String, ProviderFailure> {
        self.translate_calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .unwrap()
            .push((descriptor.clone(), request.clone()));

        let reply = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match reply {
            MockReply::Text(text) => Ok(text),
            MockReply::Fail(kind) => Err(failure_for(&descriptor.name, kind)),
            MockReply::Stall(delay, text) => {
                time::sleep(delay).await;
                Ok(text)
            }
        }
    }
}

/// The failure a real adapter would report for `kind`
pub fn failure_for(provider: &str, kind: FailureKind) -> ProviderFailure {
    match kind {
        FailureKind::Unauthorized => ProviderFailure::from_status(provider, 401),
        FailureKind::Forbidden => ProviderFailure::from_status(provider, 403),
        FailureKind::NotFound => ProviderFailure::from_status(provider, 404),
        FailureKind::RemoteRateLimited => ProviderFailure::from_status(provider, 429),
        FailureKind::ServerError => ProviderFailure::from_status(provider, 500),
        FailureKind::ServiceDown => ProviderFailure::from_status(provider, 503),
        FailureKind::Timeout => ProviderFailure::timeout(provider, Duration::from_secs(15)),
        FailureKind::Network => ProviderFailure::network(provider, "connection refused"),
        other => ProviderFailure::new(provider, other, other.issue()),
    }
}

pub fn descriptor(name: &str) -> ProviderDescriptor {
    ProviderDescriptor::new(
        name,
        format!("https://{}.test/translate", name.to_lowercase()),
        HttpMethod::Post,
    )
    .with_body(r#"{"q":"{text}","source":"{source}","target":"{target}"}"#)
}

pub fn provider(name: &str, mock: &Arc<MockProvider>) -> Provider {
    let adapter: Arc<dyn ProviderCapability> = mock.clone();
    Provider::new(descriptor(name), adapter)
}

/// Retry settings with short, deterministic delays
pub fn test_retry_config(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        initial_backoff: Duration::from_millis(100),
        max_backoff: Duration::from_secs(1),
        backoff_multiplier: 2.0,
        use_jitter: false,
        retry_permanent_failures: false,
    }
}

/// Every event currently queued on `rx`
pub fn drain(rx: &mut EventReceiver) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
