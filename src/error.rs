// for error definitions
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TranslatorError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Reading configuration or other local files failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Data serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client construction errors
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// A classified provider failure surfaced outside the dispatcher
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderFailure),

    /// Nothing to translate
    #[error("Input text is empty")]
    EmptyInput,

    /// No provider passed its availability probe
    #[error("No available providers")]
    NoProviders,

    /// Unexpected or internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

// define a Result type alias for convenience
pub type Result<T> = std::result::Result<T, TranslatorError>;

/// Failure taxonomy shared by every provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The call did not finish within its timeout
    Timeout,
    /// Connection failure or transport error
    Network,
    /// Rejected locally by the rate limiter before any call was made
    RateLimitExceeded,
    /// The provider answered HTTP 429
    RemoteRateLimited,
    /// Any 5xx other than 503
    ServerError,
    /// HTTP 503
    ServiceDown,
    /// HTTP 401
    Unauthorized,
    /// HTTP 403
    Forbidden,
    /// HTTP 404
    NotFound,
    /// Source and target language are the same after resolution
    LanguageConflict,
    /// Anything that could not be classified
    Unknown,
}

impl FailureKind {
    /// Short upper-case code used in diagnostics and logs.
    pub fn code(&self) -> &'static str {
        match self {
            FailureKind::Timeout => "TIMEOUT",
            FailureKind::Network => "NETWORK_ERROR",
            FailureKind::RateLimitExceeded => "RATE_LIMIT",
            FailureKind::RemoteRateLimited => "REMOTE_RATE_LIMIT",
            FailureKind::ServerError => "SERVER_ERROR",
            FailureKind::ServiceDown => "SERVICE_DOWN",
            FailureKind::Unauthorized => "UNAUTHORIZED",
            FailureKind::Forbidden => "FORBIDDEN",
            FailureKind::NotFound => "NOT_FOUND",
            FailureKind::LanguageConflict => "LANGUAGE_ERROR",
            FailureKind::Unknown => "UNKNOWN",
        }
    }

    /// Whether the dispatcher may retry this class of failure.
    ///
    /// `NotFound` is the one class whose answer depends on the provider:
    /// a 404 can mean a flaky deployment or an endpoint that moved for good,
    /// so the caller passes the provider's own setting.
    pub fn is_retryable(&self, retry_not_found: bool) -> bool {
        match self {
            FailureKind::Timeout
            | FailureKind::Network
            | FailureKind::RemoteRateLimited
            | FailureKind::ServerError
            | FailureKind::ServiceDown => true,
            FailureKind::NotFound => retry_not_found,
            FailureKind::RateLimitExceeded
            | FailureKind::Unauthorized
            | FailureKind::Forbidden
            | FailureKind::LanguageConflict
            | FailureKind::Unknown => false,
        }
    }

    /// Local rejections that no amount of immediate retrying can fix.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            FailureKind::RateLimitExceeded | FailureKind::LanguageConflict
        )
    }

    /// Map a non-200 HTTP status to a failure class.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => FailureKind::Unauthorized,
            403 => FailureKind::Forbidden,
            404 => FailureKind::NotFound,
            429 => FailureKind::RemoteRateLimited,
            503 => FailureKind::ServiceDown,
            500..=599 => FailureKind::ServerError,
            _ => FailureKind::Unknown,
        }
    }

    /// Default human-readable description of the issue.
    pub fn issue(&self) -> &'static str {
        match self {
            FailureKind::Timeout => "Request timed out",
            FailureKind::Network => "Network connection failed",
            FailureKind::RateLimitExceeded => "Local request budget exhausted",
            FailureKind::RemoteRateLimited => "Rate limit exceeded",
            FailureKind::ServerError => "Server error",
            FailureKind::ServiceDown => "Service temporarily unavailable",
            FailureKind::Unauthorized => "Invalid or missing API key",
            FailureKind::Forbidden => "Access forbidden",
            FailureKind::NotFound => "Service endpoint not found",
            FailureKind::LanguageConflict => "Language configuration issue",
            FailureKind::Unknown => "Unexpected failure",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A classified failure reported by a provider capability or by the
/// dispatcher's own admission checks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{provider}: {message}")]
pub struct ProviderFailure {
    pub provider: String,
    pub kind: FailureKind,
    /// HTTP status, when the provider answered at all
    pub status: Option<u16>,
    pub message: String,
}

impl ProviderFailure {
    pub fn new(provider: impl Into<String>, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            kind,
            status: None,
            message: message.into(),
        }
    }

    /// Failure built from a non-200 HTTP answer.
    pub fn from_status(provider: impl Into<String>, status: u16) -> Self {
        let kind = FailureKind::from_status(status);
        let message = match kind {
            FailureKind::ServerError => format!("Server error (HTTP {})", status),
            FailureKind::Unknown => format!("HTTP error {}", status),
            _ => kind.issue().to_string(),
        };
        Self {
            provider: provider.into(),
            kind,
            status: Some(status),
            message,
        }
    }

    pub fn timeout(provider: impl Into<String>, after: Duration) -> Self {
        Self::new(
            provider,
            FailureKind::Timeout,
            format!("Request timed out after {:?}", after),
        )
    }

    pub fn network(provider: impl Into<String>, detail: impl fmt::Display) -> Self {
        Self::new(
            provider,
            FailureKind::Network,
            format!("Network error: {}", detail),
        )
    }

    pub fn rate_limited(provider: impl Into<String>) -> Self {
        Self::new(
            provider,
            FailureKind::RateLimitExceeded,
            FailureKind::RateLimitExceeded.issue(),
        )
    }

    /// Classify a free-form error message, as returned by capabilities that
    /// only surface text. Status codes take precedence over keywords.
    pub fn classify(provider: impl Into<String>, message: &str, status: Option<u16>) -> Self {
        let lower = message.to_lowercase();
        let kind = if lower.contains("timeout") || lower.contains("deadline exceeded") {
            FailureKind::Timeout
        } else if let Some(code) = status.filter(|code| *code != 200) {
            FailureKind::from_status(code)
        } else if lower.contains("rate limit") {
            FailureKind::RemoteRateLimited
        } else if lower.contains("unauthorized") {
            FailureKind::Unauthorized
        } else if lower.contains("forbidden") {
            FailureKind::Forbidden
        } else if lower.contains("connection refused") || lower.contains("network") {
            FailureKind::Network
        } else if lower.contains("distinct languages") || lower.contains("unsupported language")
        {
            FailureKind::LanguageConflict
        } else {
            FailureKind::Unknown
        };

        Self {
            provider: provider.into(),
            kind,
            status,
            message: message.to_string(),
        }
    }
}
