// src/diagnostics.rs

//! User-facing diagnostics for terminal translation failures.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::error::{FailureKind, ProviderFailure};

/// What the presentation layer shows when a provider gives up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub provider: String,
    pub kind: FailureKind,
    pub issue: String,
    pub suggestion: String,
    pub retryable: bool,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} error", self.kind.code())?;
        writeln!(f, "Service: {}", self.provider)?;
        writeln!(f, "Issue: {}", self.issue)?;
        writeln!(f, "Suggestion: {}", self.suggestion)?;
        if self.retryable {
            write!(f, "Transient failure, try again later")
        } else {
            write!(f, "Manual intervention required")
        }
    }
}

/// Remedy text keyed by provider name and failure kind, with generic
/// per-kind defaults.
#[derive(Debug, Clone)]
pub struct SuggestionTable {
    overrides: HashMap<(String, FailureKind), String>,
}

impl SuggestionTable {
    /// Table with no provider-specific entries.
    pub fn empty() -> Self {
        Self {
            overrides: HashMap::new(),
        }
    }

    pub fn with(mut self, provider: &str, kind: FailureKind, suggestion: &str) -> Self {
        self.insert(provider, kind, suggestion);
        self
    }

    pub fn insert(&mut self, provider: &str, kind: FailureKind, suggestion: &str) {
        self.overrides
            .insert((provider.to_string(), kind), suggestion.to_string());
    }

    pub fn suggestion(&self, provider: &str, kind: FailureKind) -> &str {
        self.overrides
            .get(&(provider.to_string(), kind))
            .map(String::as_str)
            .unwrap_or_else(|| default_suggestion(kind))
    }

    /// Turn a classified failure into the text shown to the user.
    pub fn diagnose(&self, failure: &ProviderFailure, retryable: bool) -> Diagnostic {
        Diagnostic {
            provider: failure.provider.clone(),
            kind: failure.kind,
            issue: failure.message.clone(),
            suggestion: self.suggestion(&failure.provider, failure.kind).to_string(),
            retryable,
        }
    }
}

impl Default for SuggestionTable {
    fn default() -> Self {
        Self::empty()
            .with(
                "OPENAI",
                FailureKind::Unauthorized,
                "Check your credential configuration; API keys are issued at https://platform.openai.com/account/api-keys",
            )
            .with(
                "OPENAI",
                FailureKind::RemoteRateLimited,
                "OpenAI has usage limits. Check your account quota or upgrade plan",
            )
            .with(
                "OPENROUTER",
                FailureKind::Unauthorized,
                "Check your credential configuration; API keys are issued at https://openrouter.ai/keys",
            )
            .with(
                "OPENROUTER",
                FailureKind::RemoteRateLimited,
                "OpenRouter rate limits apply. Wait or upgrade your plan",
            )
            .with(
                "GOOGLE",
                FailureKind::RemoteRateLimited,
                "Google Translate has rate limits. Try again in a few minutes",
            )
            .with(
                "DEEPL",
                FailureKind::Unauthorized,
                "Check your credential configuration; DeepL requires a valid API key for advanced features",
            )
            .with(
                "REVERSO",
                FailureKind::RemoteRateLimited,
                "Reverso limits requests. Wait before trying again",
            )
            .with(
                "REVERSO2",
                FailureKind::RemoteRateLimited,
                "Reverso limits requests. Wait before trying again",
            )
            .with(
                "MYMEMORY",
                FailureKind::RemoteRateLimited,
                "MyMemory has daily limits for anonymous users",
            )
            .with(
                "LINGVA",
                FailureKind::ServerError,
                "Lingva is a community service. Try again later",
            )
    }
}

fn default_suggestion(kind: FailureKind) -> &'static str {
    match kind {
        FailureKind::Timeout => "Check your internet connection or try again",
        FailureKind::Network => "Check your internet connection",
        FailureKind::RateLimitExceeded => "Wait for the rate limit window to pass before trying again",
        FailureKind::RemoteRateLimited => "Wait a moment before trying again",
        FailureKind::ServerError => "Service is experiencing issues, try again later",
        FailureKind::ServiceDown => "Service is down for maintenance, try again later",
        FailureKind::Unauthorized => "Check your credential (API key) configuration",
        FailureKind::Forbidden => "API key may be invalid or service unavailable",
        FailureKind::NotFound => "Service may be temporarily unavailable",
        FailureKind::LanguageConflict => "Check source and target language settings",
        FailureKind::Unknown => "Try a different service or check input text",
    }
}
