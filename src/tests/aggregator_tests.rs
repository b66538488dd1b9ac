// src/tests/aggregator_tests.rs

use std::time::Duration;
use uuid::Uuid;

use crate::aggregate::{retry_placeholder, Aggregator, ProviderStatus};
use crate::diagnostics::SuggestionTable;
use crate::error::ProviderFailure;
use crate::events::{self, EngineEvent, ProbeOutcome};

fn started(providers: &[&str]) -> EngineEvent {
    EngineEvent::ProbingStarted {
        providers: providers.iter().map(|p| p.to_string()).collect(),
    }
}

fn resolved(provider: &str, index: usize, status: u16) -> EngineEvent {
    EngineEvent::ProbeResolved(ProbeOutcome::answered(
        provider,
        index,
        status,
        Duration::from_millis(40),
    ))
}

fn dispatched(task_id: Uuid, provider: &str) -> EngineEvent {
    EngineEvent::TaskDispatched {
        task_id,
        provider: provider.to_string(),
    }
}

fn attempt(task_id: Uuid, provider: &str, attempt: u32) -> EngineEvent {
    EngineEvent::AttemptStarted {
        task_id,
        provider: provider.to_string(),
        attempt,
        max_attempts: 3,
    }
}

fn retry(task_id: Uuid, provider: &str, next_attempt: u32) -> EngineEvent {
    EngineEvent::RetryScheduled {
        task_id,
        provider: provider.to_string(),
        next_attempt,
        max_attempts: 3,
        delay: Duration::from_millis(500),
        failure: ProviderFailure::from_status(provider, 503),
    }
}

fn succeeded(task_id: Uuid, provider: &str, text: &str, attempts: u32) -> EngineEvent {
    EngineEvent::TranslationSucceeded {
        task_id,
        provider: provider.to_string(),
        text: text.to_string(),
        attempts,
        from_cache: false,
    }
}

#[test]
fn test_probe_progress() {
    let mut aggregator = Aggregator::new();
    aggregator.apply(&started(&["GOOGLE", "DEEPL", "LINGVA"]));

    assert_eq!(aggregator.status("DEEPL"), ProviderStatus::Probing);
    assert_eq!(aggregator.progress().probes_total, 3);
    assert!(!aggregator.is_probing_complete());

    aggregator.apply(&resolved("DEEPL", 1, 200));
    aggregator.apply(&EngineEvent::ProbeResolved(ProbeOutcome::failed(
        "LINGVA",
        2,
        "probe timed out after 5s",
        Duration::from_secs(5),
    )));
    aggregator.apply(&resolved("GOOGLE", 0, 403));

    let progress = aggregator.progress();
    assert_eq!(progress.probes_resolved, 3);
    assert_eq!(aggregator.available_providers(), &["DEEPL".to_string()]);
    assert_eq!(aggregator.status("GOOGLE"), ProviderStatus::Unavailable);
    assert_eq!(aggregator.display("GOOGLE"), Some("Unavailable (HTTP 403)"));
    assert!(aggregator
        .display("LINGVA")
        .unwrap_or_default()
        .contains("timed out"));

    aggregator.apply(&EngineEvent::ProbingCompleted {
        available: vec!["DEEPL".to_string()],
        total: 3,
    });
    assert!(aggregator.is_probing_complete());
    assert_eq!(aggregator.available_providers().len(), 1);

    // First-seen order is kept for rendering
    assert_eq!(aggregator.providers(), &["GOOGLE", "DEEPL", "LINGVA"]);
}

#[test]
fn test_available_set_is_append_only() {
    let mut aggregator = Aggregator::new();
    aggregator.apply(&started(&["GOOGLE"]));
    aggregator.apply(&resolved("GOOGLE", 0, 200));

    // A later round reporting the provider down does not remove it
    aggregator.apply(&started(&["GOOGLE", "DEEPL"]));
    aggregator.apply(&resolved("GOOGLE", 0, 500));
    aggregator.apply(&resolved("DEEPL", 1, 200));

    assert_eq!(
        aggregator.available_providers(),
        &["GOOGLE".to_string(), "DEEPL".to_string()]
    );
    assert_eq!(aggregator.progress().probes_resolved, 2);
    assert_eq!(aggregator.progress().probes_total, 2);
}

#[test]
fn test_retry_placeholder_until_next_result() {
    let mut aggregator = Aggregator::new();
    let task = Uuid::new_v4();

    aggregator.apply(&dispatched(task, "DEEPL"));
    aggregator.apply(&attempt(task, "DEEPL", 1));
    assert_eq!(aggregator.display("DEEPL"), Some("Translating..."));

    aggregator.apply(&retry(task, "DEEPL", 2));
    assert_eq!(aggregator.status("DEEPL"), ProviderStatus::Retrying);
    assert_eq!(aggregator.display("DEEPL"), Some("Retrying... (attempt 2/3)"));

    aggregator.apply(&attempt(task, "DEEPL", 2));
    assert_eq!(aggregator.status("DEEPL"), ProviderStatus::Translating);
    assert_eq!(aggregator.display("DEEPL"), Some(retry_placeholder(2, 3).as_str()));

    aggregator.apply(&succeeded(task, "DEEPL", "Hallo", 2));
    assert_eq!(aggregator.status("DEEPL"), ProviderStatus::Succeeded);
    assert_eq!(aggregator.display("DEEPL"), Some("Hallo"));
    assert_eq!(aggregator.view("DEEPL").map(|view| view.attempts), Some(2));
}

#[test]
fn test_interleaved_providers() {
    let mut aggregator = Aggregator::new();
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

    aggregator.apply(&dispatched(a, "GOOGLE"));
    aggregator.apply(&dispatched(b, "OPENAI"));
    aggregator.apply(&attempt(b, "OPENAI", 1));
    aggregator.apply(&attempt(a, "GOOGLE", 1));

    let failure = ProviderFailure::from_status("OPENAI", 401);
    let diagnostic = SuggestionTable::default().diagnose(&failure, false);
    aggregator.apply(&EngineEvent::TranslationFailed {
        task_id: b,
        provider: "OPENAI".to_string(),
        diagnostic,
        attempts: 1,
    });

    assert_eq!(aggregator.status("GOOGLE"), ProviderStatus::Translating);
    assert_eq!(aggregator.status("OPENAI"), ProviderStatus::Failed);
    assert!(!aggregator.is_translation_complete());

    aggregator.apply(&succeeded(a, "GOOGLE", "Hallo", 1));

    let progress = aggregator.progress();
    assert_eq!(progress.translations_dispatched, 2);
    assert_eq!(progress.translations_completed, 2);
    assert!(aggregator.is_translation_complete());

    let display = aggregator.display("OPENAI").unwrap_or_default();
    assert!(display.starts_with("UNAUTHORIZED error"));
    assert!(display.contains("platform.openai.com"));
}

#[test]
fn test_last_event_wins_display_slot() {
    let mut aggregator = Aggregator::new();
    let (first, second) = (Uuid::new_v4(), Uuid::new_v4());

    aggregator.apply(&dispatched(first, "GOOGLE"));
    aggregator.apply(&dispatched(second, "GOOGLE"));
    aggregator.apply(&succeeded(second, "GOOGLE", "zweite", 1));
    aggregator.apply(&succeeded(first, "GOOGLE", "erste", 1));

    assert_eq!(aggregator.display("GOOGLE"), Some("erste"));
    assert!(aggregator.is_translation_complete());
}

#[test]
fn test_unknown_provider_is_idle() {
    let aggregator = Aggregator::new();
    assert_eq!(aggregator.status("NOPE"), ProviderStatus::Idle);
    assert_eq!(aggregator.display("NOPE"), None);
}

#[tokio::test]
async fn test_drain_applies_queued_events() {
    let (tx, mut rx) = events::channel();
    let task = Uuid::new_v4();
    tx.emit(dispatched(task, "LINGVA"));
    tx.emit(succeeded(task, "LINGVA", "Hallo", 1));

    let mut aggregator = Aggregator::new();
    assert_eq!(aggregator.drain(&mut rx), 2);
    assert_eq!(aggregator.status("LINGVA"), ProviderStatus::Succeeded);

    // Nothing left
    assert_eq!(aggregator.drain(&mut rx), 0);
}
