// src/config/mod.rs

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{Result, TranslatorError};
use crate::resilience::RetryConfig;

/// Placeholder substituted with the provider credential.
pub const CREDENTIAL_PLACEHOLDER: &str = "{api_key}";

/// Environment variable prefix for per-provider credentials,
/// e.g. `MULTI_TRANSLATOR_API_KEY_OPENAI`.
pub const CREDENTIAL_ENV_PREFIX: &str = "MULTI_TRANSLATOR_API_KEY_";

/// Environment variable overriding the default target language.
pub const TARGET_ENV: &str = "MULTI_TRANSLATOR_TARGET";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    #[default]
    Post,
}

/// Immutable description of one translation provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    /// Unique provider name
    pub name: String,

    /// Request URL template
    pub endpoint: String,

    #[serde(default)]
    pub method: HttpMethod,

    /// Header templates; values may contain `{api_key}`
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Request body template
    #[serde(default)]
    pub body: Option<String>,

    /// URL used for the availability probe, defaults to `endpoint`
    #[serde(default)]
    pub probe_endpoint: Option<String>,

    /// Body used for the availability probe, defaults to `body`
    #[serde(default)]
    pub probe_body: Option<String>,

    /// JSON pointer to the translated text in the response
    #[serde(default)]
    pub response_pointer: Option<String>,

    /// Requests fail without a credential for this provider
    #[serde(default)]
    pub requires_credential: bool,

    /// Disabled providers are never probed nor dispatched to
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Provider-specific language codes, exposed to templates as
    /// `{source_code}` and `{target_code}`. Unmapped codes pass through.
    #[serde(default)]
    pub language_codes: BTreeMap<String, String>,

    /// Overrides the engine-wide default window
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,

    /// Whether HTTP 404 counts as a transient failure for this provider
    #[serde(default = "default_retry_not_found")]
    pub retry_not_found: bool,
}

fn default_retry_not_found() -> bool {
    true
}

fn default_enabled() -> bool {
    true
}

impl ProviderDescriptor {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>, method: HttpMethod) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            method,
            headers: BTreeMap::new(),
            body: None,
            probe_endpoint: None,
            probe_body: None,
            response_pointer: None,
            requires_credential: false,
            enabled: default_enabled(),
            language_codes: BTreeMap::new(),
            rate_limit: None,
            retry_not_found: default_retry_not_found(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_body(mut self, body: &str) -> Self {
        self.body = Some(body.to_string());
        self
    }

    pub fn with_response_pointer(mut self, pointer: &str) -> Self {
        self.response_pointer = Some(pointer.to_string());
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = Some(rate_limit);
        self
    }

    pub fn requiring_credential(mut self) -> Self {
        self.requires_credential = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn with_language_codes<'a>(
        mut self,
        codes: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        self.language_codes = codes
            .into_iter()
            .map(|(code, mapped)| (code.to_string(), mapped.to_string()))
            .collect();
        self
    }

    /// This provider's spelling of a language code.
    pub fn language_code<'a>(&'a self, code: &'a str) -> &'a str {
        self.language_codes
            .get(code)
            .map(String::as_str)
            .unwrap_or(code)
    }

    /// Per-call copy of this descriptor with the credential filled in.
    ///
    /// Header values containing `{api_key}` get it substituted; an
    /// `Authorization` header without the placeholder is replaced by a
    /// bearer token. `self` is left untouched.
    pub fn with_credential(&self, credential: &str) -> Self {
        let mut descriptor = self.clone();
        for (name, value) in descriptor.headers.iter_mut() {
            if value.contains(CREDENTIAL_PLACEHOLDER) {
                *value = value.replace(CREDENTIAL_PLACEHOLDER, credential);
            } else if name.eq_ignore_ascii_case("authorization") {
                *value = format!("Bearer {}", credential);
            }
        }
        descriptor
    }
}

/// Configuration for the per-provider fixed window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum number of requests allowed in the window
    pub max_requests: u64,

    /// Window duration
    #[serde(with = "duration_serde")]
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window: Duration::from_secs(60),
        }
    }
}

/// Configuration for the startup availability probes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Start delay added per provider index
    #[serde(default = "default_stagger", with = "duration_serde")]
    pub stagger: Duration,

    /// Timeout for a single probe
    #[serde(default = "default_probe_timeout", with = "duration_serde")]
    pub timeout: Duration,
}

fn default_stagger() -> Duration {
    Duration::from_millis(300)
}

fn default_probe_timeout() -> Duration {
    Duration::from_secs(5)
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            stagger: default_stagger(),
            timeout: default_probe_timeout(),
        }
    }
}

/// Translation timeout that grows with the input size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutPolicy {
    #[serde(default = "default_base_timeout", with = "duration_serde")]
    pub base: Duration,

    /// Byte length above which `medium` applies
    #[serde(default = "default_medium_threshold")]
    pub medium_threshold: usize,

    #[serde(default = "default_medium_timeout", with = "duration_serde")]
    pub medium: Duration,

    /// Byte length above which `large` applies
    #[serde(default = "default_large_threshold")]
    pub large_threshold: usize,

    #[serde(default = "default_large_timeout", with = "duration_serde")]
    pub large: Duration,
}

fn default_base_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_medium_threshold() -> usize {
    500
}

fn default_medium_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_large_threshold() -> usize {
    1500
}

fn default_large_timeout() -> Duration {
    Duration::from_secs(45)
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            base: default_base_timeout(),
            medium_threshold: default_medium_threshold(),
            medium: default_medium_timeout(),
            large_threshold: default_large_threshold(),
            large: default_large_timeout(),
        }
    }
}

impl TimeoutPolicy {
    pub fn for_text(&self, text: &str) -> Duration {
        let len = text.len();
        if len > self.large_threshold {
            self.large
        } else if len > self.medium_threshold {
            self.medium
        } else {
            self.base
        }
    }
}

/// Everything the engine needs to run a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderDescriptor>,

    /// Credentials keyed by provider name
    #[serde(default)]
    pub credentials: HashMap<String, String>,

    #[serde(default = "default_target")]
    pub default_target: String,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub probe: ProbeConfig,

    #[serde(default)]
    pub timeouts: TimeoutPolicy,

    /// Window applied to providers without their own `rate_limit`
    #[serde(default)]
    pub default_rate_limit: RateLimitConfig,
}

fn default_target() -> String {
    "ru".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            providers: default_providers(),
            credentials: HashMap::new(),
            default_target: default_target(),
            retry: RetryConfig::default(),
            probe: ProbeConfig::default(),
            timeouts: TimeoutPolicy::default(),
            default_rate_limit: RateLimitConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_json(&contents)?;
        info!(
            path = %path.display(),
            providers = config.providers.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Pick up credentials and the target language from the environment.
    pub fn apply_env(&mut self) {
        self.apply_vars(std::env::vars());
    }

    fn apply_vars(&mut self, vars: impl Iterator<Item = (String, String)>) {
        for (key, value) in vars {
            if value.is_empty() {
                continue;
            }
            if let Some(provider) = key.strip_prefix(CREDENTIAL_ENV_PREFIX) {
                debug!(provider, "Credential taken from environment");
                self.credentials.insert(provider.to_uppercase(), value);
            } else if key == TARGET_ENV {
                self.default_target = value;
            }
        }
    }

    pub fn credential(&self, provider: &str) -> Option<&str> {
        self.credentials
            .get(provider)
            .map(String::as_str)
            .filter(|key| !key.is_empty())
    }

    /// Enabled providers that require a credential but have none.
    pub fn missing_credentials(&self) -> Vec<&str> {
        self.providers
            .iter()
            .filter(|provider| provider.enabled && provider.requires_credential)
            .filter(|provider| self.credential(&provider.name).is_none())
            .map(|provider| provider.name.as_str())
            .collect()
    }

    /// Log a warning for every provider in `missing_credentials`.
    pub fn warn_missing_credentials(&self) {
        for provider in self.missing_credentials() {
            warn!(
                provider,
                env = %format!("{}{}", CREDENTIAL_ENV_PREFIX, provider),
                "Credential missing, requests will be rejected"
            );
        }
    }

    /// Window for a provider, falling back to the engine default.
    pub fn rate_limit_for(&self, provider: &ProviderDescriptor) -> RateLimitConfig {
        provider.rate_limit.unwrap_or(self.default_rate_limit)
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for provider in &self.providers {
            if provider.name.is_empty() {
                return Err(TranslatorError::Config(
                    "provider name must not be empty".to_string(),
                ));
            }
            if !seen.insert(provider.name.as_str()) {
                return Err(TranslatorError::Config(format!(
                    "duplicate provider name: {}",
                    provider.name
                )));
            }
            if let Some(limit) = provider.rate_limit {
                if limit.max_requests == 0 || limit.window.is_zero() {
                    return Err(TranslatorError::Config(format!(
                        "invalid rate limit for provider {}",
                        provider.name
                    )));
                }
            }
        }
        if self.retry.max_attempts == 0 {
            return Err(TranslatorError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Three-letter codes the Reverso API expects.
pub fn reverso_language_codes() -> [(&'static str, &'static str); 10] {
    [
        ("en", "eng"),
        ("ru", "rus"),
        ("de", "ger"),
        ("fr", "fra"),
        ("es", "spa"),
        ("it", "ita"),
        ("ja", "jpn"),
        ("zh", "chi"),
        ("ko", "kor"),
        ("ar", "ara"),
    ]
}

const CHAT_PROMPT: &str = "Translate '{text}' from {source_name} to {target_name}. Return only the translation, no additional text.";

fn chat_body(model: &str) -> String {
    format!(
        r#"{{"model":"{}","messages":[{{"role":"user","content":"{}"}}]}}"#,
        model, CHAT_PROMPT
    )
}

/// Built-in provider table.
pub fn default_providers() -> Vec<ProviderDescriptor> {
    vec![
        ProviderDescriptor::new(
            "GOOGLE",
            "https://translate-serverless.vercel.app/api/translate",
            HttpMethod::Post,
        )
        .with_header("Content-Type", "application/json")
        .with_body(r#"{"message":"{text}","from":"{source}","to":"{target}"}"#)
        .with_response_pointer("/translation/trans_result/dst"),
        ProviderDescriptor::new(
            "DEEPL",
            "https://deeplx-vercel-phi.vercel.app/api/translate",
            HttpMethod::Post,
        )
        .with_header("Content-Type", "application/json")
        .with_body(r#"{"text":"{text}","source_lang":"{source_upper}","target_lang":"{target_upper}"}"#)
        .with_response_pointer("/data"),
        ProviderDescriptor::new(
            "REVERSO",
            "https://api.reverso.net/translate/v1/translation",
            HttpMethod::Post,
        )
        .with_header("Content-Type", "application/json")
        .with_body(r#"{"format":"text","from":"{source_code}","to":"{target_code}","input":"{text}"}"#)
        .with_language_codes(reverso_language_codes())
        .with_response_pointer("/translation/0"),
        ProviderDescriptor::new(
            "REVERSO2",
            "https://api.reverso.net/translate/v1/translation",
            HttpMethod::Post,
        )
        .with_header("Content-Type", "application/json")
        .with_body(
            r#"{"format":"text","from":"{source_code}","to":"{target_code}","input":"{text}","options":{"sentenceSplitter":true,"origin":"translation.web","contextResults":false,"languageDetection":false}}"#,
        )
        .with_language_codes(reverso_language_codes())
        .with_response_pointer("/translation/0"),
        ProviderDescriptor::new(
            "LINGVA",
            "https://lingva.thedaviddelta.com/api/v1/{source}/{target}/{text}",
            HttpMethod::Get,
        )
        .with_response_pointer("/translation"),
        ProviderDescriptor::new(
            "MYMEMORY",
            "https://api.mymemory.translated.net/get?q={text}&langpair={source}|{target}",
            HttpMethod::Get,
        )
        .with_response_pointer("/responseData/translatedText"),
        ProviderDescriptor::new(
            "OPENAI",
            "https://api.openai.com/v1/chat/completions",
            HttpMethod::Post,
        )
        .with_header("Content-Type", "application/json")
        .with_header("Authorization", "Bearer {api_key}")
        .with_body(&chat_body("gpt-3.5-turbo"))
        .with_response_pointer("/choices/0/message/content")
        .requiring_credential(),
        ProviderDescriptor::new(
            "OPENROUTER",
            "https://openrouter.ai/api/v1/chat/completions",
            HttpMethod::Post,
        )
        .with_header("Content-Type", "application/json")
        .with_header("Authorization", "Bearer {api_key}")
        .with_body(&chat_body("deepseek/deepseek-chat-v3.1:free"))
        .with_response_pointer("/choices/0/message/content")
        .requiring_credential(),
    ]
}

// Helper module to serialize/deserialize Duration with serde
pub(crate) mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_injection_leaves_template_untouched() {
        let template = ProviderDescriptor::new("OPENAI", "https://example.test", HttpMethod::Post)
            .with_header("Authorization", "Bearer {api_key}")
            .with_header("Content-Type", "application/json");

        let filled = template.with_credential("sk-123");

        assert_eq!(filled.headers["Authorization"], "Bearer sk-123");
        assert_eq!(filled.headers["Content-Type"], "application/json");
        assert_eq!(template.headers["Authorization"], "Bearer {api_key}");
    }

    #[test]
    fn test_authorization_without_placeholder_becomes_bearer() {
        let template = ProviderDescriptor::new("X", "https://example.test", HttpMethod::Get)
            .with_header("Authorization", "Bearer YOUR_OPENAI_KEY");

        let filled = template.with_credential("abc");
        assert_eq!(filled.headers["Authorization"], "Bearer abc");
    }

    #[test]
    fn test_timeout_scales_with_text_size() {
        let policy = TimeoutPolicy::default();
        assert_eq!(policy.for_text("hello"), Duration::from_secs(15));
        assert_eq!(policy.for_text(&"a".repeat(501)), Duration::from_secs(30));
        assert_eq!(policy.for_text(&"a".repeat(1501)), Duration::from_secs(45));
    }

    #[test]
    fn test_json_config_with_defaults() {
        let json = r#"{
            "providers": [
                {
                    "name": "LINGVA",
                    "endpoint": "https://lingva.example/api/v1/{source}/{target}/{text}",
                    "method": "GET",
                    "response_pointer": "/translation",
                    "rate_limit": { "max_requests": 2, "window": 60000 },
                    "retry_not_found": false
                }
            ],
            "default_target": "de"
        }"#;

        let config = EngineConfig::from_json(json).unwrap();
        assert_eq!(config.providers.len(), 1);
        assert_eq!(config.default_target, "de");
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.probe.stagger, Duration::from_millis(300));

        let provider = &config.providers[0];
        assert_eq!(provider.method, HttpMethod::Get);
        assert!(!provider.retry_not_found);
        assert_eq!(
            config.rate_limit_for(provider),
            RateLimitConfig {
                max_requests: 2,
                window: Duration::from_secs(60)
            }
        );
    }

    #[test]
    fn test_duplicate_provider_names_rejected() {
        let json = r#"{
            "providers": [
                { "name": "A", "endpoint": "https://a.test" },
                { "name": "A", "endpoint": "https://b.test" }
            ]
        }"#;

        let err = EngineConfig::from_json(json).unwrap_err();
        assert!(matches!(err, TranslatorError::Config(_)));
    }

    #[test]
    fn test_env_credentials_and_target() {
        let mut config = EngineConfig::default();
        config.apply_vars(
            vec![
                (format!("{}openai", CREDENTIAL_ENV_PREFIX), "sk-env".to_string()),
                (TARGET_ENV.to_string(), "fr".to_string()),
                ("UNRELATED".to_string(), "x".to_string()),
            ]
            .into_iter(),
        );

        assert_eq!(config.credential("OPENAI"), Some("sk-env"));
        assert_eq!(config.default_target, "fr");
    }

    #[test]
    fn test_default_providers_are_valid() {
        let config = EngineConfig::default();
        config.validate().unwrap();
        assert!(config
            .providers
            .iter()
            .any(|provider| provider.requires_credential));
    }

    #[test]
    fn test_default_table_covers_every_provider() {
        let names: Vec<String> = default_providers()
            .into_iter()
            .map(|provider| provider.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "GOOGLE", "DEEPL", "REVERSO", "REVERSO2", "LINGVA", "MYMEMORY", "OPENAI",
                "OPENROUTER"
            ]
        );
    }

    #[test]
    fn test_reverso_language_codes() {
        let providers = default_providers();
        let reverso = providers
            .iter()
            .find(|provider| provider.name == "REVERSO")
            .unwrap();

        assert_eq!(reverso.language_code("en"), "eng");
        assert_eq!(reverso.language_code("de"), "ger");
        assert_eq!(reverso.language_code("auto"), "auto");

        let lingva = providers
            .iter()
            .find(|provider| provider.name == "LINGVA")
            .unwrap();
        assert_eq!(lingva.language_code("en"), "en");
    }

    #[test]
    fn test_chat_bodies_are_valid_json() {
        for provider in default_providers()
            .iter()
            .filter(|provider| provider.requires_credential)
        {
            let body = provider.body.as_deref().unwrap();
            let parsed: serde_json::Value = serde_json::from_str(body).unwrap();
            let prompt = parsed["messages"][0]["content"].as_str().unwrap();
            assert!(prompt.contains("{source_name}"), "{}", provider.name);
        }
    }

    #[test]
    fn test_enabled_and_language_codes_from_json() {
        let json = r#"{
            "providers": [
                {
                    "name": "REVERSO",
                    "endpoint": "https://reverso.example/translation",
                    "language_codes": { "en": "eng" },
                    "enabled": false
                },
                { "name": "LINGVA", "endpoint": "https://lingva.example" }
            ]
        }"#;

        let config = EngineConfig::from_json(json).unwrap();
        assert!(!config.providers[0].enabled);
        assert_eq!(config.providers[0].language_code("en"), "eng");
        assert!(config.providers[1].enabled);
        assert!(config.providers[1].language_codes.is_empty());
    }

    #[test]
    fn test_missing_credentials() {
        let mut config = EngineConfig::default();
        assert_eq!(config.missing_credentials(), vec!["OPENAI", "OPENROUTER"]);

        config
            .credentials
            .insert("OPENAI".to_string(), "sk-1".to_string());
        config
            .credentials
            .insert("OPENROUTER".to_string(), String::new());
        assert_eq!(config.missing_credentials(), vec!["OPENROUTER"]);

        // Disabled providers need no credential
        for provider in config.providers.iter_mut() {
            if provider.name == "OPENROUTER" {
                provider.enabled = false;
            }
        }
        assert!(config.missing_credentials().is_empty());
    }
}
