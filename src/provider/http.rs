// src/provider/http.rs

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::{debug, trace};

use crate::config::{HttpMethod, ProviderDescriptor};
use crate::error::{FailureKind, ProviderFailure, Result};
use crate::language::language_name;
use crate::provider::{ProviderCapability, TranslationRequest};

/// Sample request sent by probes when the descriptor has no dedicated
/// probe body.
fn probe_request() -> TranslationRequest {
    TranslationRequest {
        text: "test".to_string(),
        source: "en".to_string(),
        target: "de".to_string(),
    }
}

/// Template-driven HTTP adapter.
///
/// Request URL, headers and body come from the descriptor templates; the
/// translated text is read from the JSON response at `response_pointer`, or
/// taken as the whole body when no pointer is configured. Timeouts are left
/// to the caller.
#[derive(Debug, Clone)]
pub struct HttpProvider {
    client: Client,
}

impl HttpProvider {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("multi_translator/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn build(&self, descriptor: &ProviderDescriptor, url: String, body: Option<String>) -> RequestBuilder {
        let mut builder = match descriptor.method {
            HttpMethod::Get => self.client.get(url),
            HttpMethod::Post => self.client.post(url),
        };
        for (name, value) in &descriptor.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }
        builder
    }
}

/// Expand the language placeholders, then `{text}` last so the text
/// itself is never expanded.
fn substitute(
    template: &str,
    descriptor: &ProviderDescriptor,
    request: &TranslationRequest,
    text: &str,
) -> String {
    template
        .replace("{source_upper}", &request.source.to_uppercase())
        .replace("{target_upper}", &request.target.to_uppercase())
        .replace("{source_code}", descriptor.language_code(&request.source))
        .replace("{target_code}", descriptor.language_code(&request.target))
        .replace("{source_name}", language_name(&request.source))
        .replace("{target_name}", language_name(&request.target))
        .replace("{source}", &request.source)
        .replace("{target}", &request.target)
        .replace("{text}", text)
}

/// Fill a URL template; the text is percent-encoded.
pub fn render_url(
    template: &str,
    descriptor: &ProviderDescriptor,
    request: &TranslationRequest,
) -> String {
    let encoded = utf8_percent_encode(&request.text, NON_ALPHANUMERIC).to_string();
    substitute(template, descriptor, request, &encoded)
}

/// Fill a JSON body template; the text is escaped for a JSON string.
pub fn render_body(
    template: &str,
    descriptor: &ProviderDescriptor,
    request: &TranslationRequest,
) -> String {
    let quoted = Value::String(request.text.clone()).to_string();
    let escaped = &quoted[1..quoted.len() - 1];
    substitute(template, descriptor, request, escaped)
}

/// Pull the translation out of a response body.
pub fn extract_translation(body: &str, pointer: Option<&str>) -> Option<String> {
    let Some(pointer) = pointer else {
        let text = body.trim();
        return (!text.is_empty()).then(|| text.to_string());
    };

    let document: Value = serde_json::from_str(body).ok()?;
    match document.pointer(pointer)? {
        Value::String(text) => Some(text.trim().to_string()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn transport_failure(provider: &str, err: reqwest::Error) -> ProviderFailure {
    if err.is_timeout() {
        ProviderFailure::new(provider, FailureKind::Timeout, format!("Request timed out: {}", err))
    } else {
        ProviderFailure::network(provider, err)
    }
}

#[async_trait]
impl ProviderCapability for HttpProvider {
    async fn probe(&self, descriptor: &ProviderDescriptor) -> std::result::Result<u16, ProviderFailure> {
        let sample = probe_request();
        let url = render_url(
            descriptor
                .probe_endpoint
                .as_deref()
                .unwrap_or(&descriptor.endpoint),
            descriptor,
            &sample,
        );
        let body = descriptor.probe_body.clone().or_else(|| {
            descriptor
                .body
                .as_deref()
                .map(|body| render_body(body, descriptor, &sample))
        });

        trace!(provider = %descriptor.name, url = %url, "Sending probe");
        let response = self
            .build(descriptor, url, body)
            .send()
            .await
            .map_err(|err| transport_failure(&descriptor.name, err))?;

        Ok(response.status().as_u16())
    }

    async fn translate(
        &self,
        descriptor: &ProviderDescriptor,
        request: &TranslationRequest,
    ) -> std::result::Result<String, ProviderFailure> {
        let url = render_url(&descriptor.endpoint, descriptor, request);
        let body = descriptor
            .body
            .as_deref()
            .map(|template| render_body(template, descriptor, request));

        let response = self
            .build(descriptor, url, body)
            .send()
            .await
            .map_err(|err| transport_failure(&descriptor.name, err))?;

        let status = response.status();
        if status != StatusCode::OK {
            debug!(provider = %descriptor.name, status = status.as_u16(), "Provider returned error status");
            return Err(ProviderFailure::from_status(&descriptor.name, status.as_u16()));
        }

        let body = response.text().await.map_err(|err| {
            ProviderFailure::network(
                &descriptor.name,
                format!("Failed to read response: {}", err),
            )
        })?;

        extract_translation(&body, descriptor.response_pointer.as_deref()).ok_or_else(|| {
            ProviderFailure::new(
                &descriptor.name,
                FailureKind::Unknown,
                "Unexpected response format",
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{default_providers, reverso_language_codes};

    fn plain() -> ProviderDescriptor {
        ProviderDescriptor::new("LINGVA", "https://lingva.example", HttpMethod::Get)
    }

    fn builtin(name: &str) -> ProviderDescriptor {
        default_providers()
            .into_iter()
            .find(|provider| provider.name == name)
            .unwrap()
    }

    fn request(text: &str) -> TranslationRequest {
        TranslationRequest {
            text: text.to_string(),
            source: "en".to_string(),
            target: "de".to_string(),
        }
    }

    #[test]
    fn test_render_url_encodes_text() {
        let url = render_url(
            "https://lingva.example/api/v1/{source}/{target}/{text}",
            &plain(),
            &request("hello world/?"),
        );
        assert_eq!(
            url,
            "https://lingva.example/api/v1/en/de/hello%20world%2F%3F"
        );
    }

    #[test]
    fn test_render_body_escapes_text() {
        let body = render_body(
            r#"{"text":"{text}","source_lang":"{source_upper}","target_lang":"{target_upper}"}"#,
            &plain(),
            &request("say \"hi\"\n"),
        );
        let parsed: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed["text"], "say \"hi\"\n");
        assert_eq!(parsed["source_lang"], "EN");
        assert_eq!(parsed["target_lang"], "DE");
    }

    #[test]
    fn test_text_placeholders_inside_text_are_not_expanded() {
        let body = render_body(
            r#"{"q":"{text}","to":"{target}"}"#,
            &plain(),
            &request("{target}"),
        );
        let parsed: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed["q"], "{target}");
    }

    #[test]
    fn test_extract_translation() {
        let body = r#"{"choices":[{"message":{"content":" Hallo "}}]}"#;
        assert_eq!(
            extract_translation(body, Some("/choices/0/message/content")).as_deref(),
            Some("Hallo")
        );
        assert_eq!(extract_translation(body, Some("/missing")), None);
        assert_eq!(extract_translation("not json", Some("/a")), None);
        assert_eq!(extract_translation(" Hallo\n", None).as_deref(), Some("Hallo"));
        assert_eq!(extract_translation("   ", None), None);
    }

    #[test]
    fn test_language_codes_are_mapped_per_provider() {
        let reverso = builtin("REVERSO");
        let body = render_body(reverso.body.as_deref().unwrap(), &reverso, &request("hello"));
        let parsed: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed["from"], "eng");
        assert_eq!(parsed["to"], "ger");
        assert_eq!(parsed["input"], "hello");

        // Without a mapping the code passes through
        let custom = plain().with_language_codes(reverso_language_codes().into_iter().take(1));
        let url = render_url("https://x.test/{source_code}/{target_code}", &custom, &request("hi"));
        assert_eq!(url, "https://x.test/eng/de");
    }

    #[test]
    fn test_chat_prompt_uses_language_names() {
        let openai = builtin("OPENAI");
        let body = render_body(openai.body.as_deref().unwrap(), &openai, &request("it's \"ok\""));
        let parsed: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(
            parsed["messages"][0]["content"],
            "Translate 'it's \"ok\"' from English to German. Return only the translation, no additional text."
        );
        assert_eq!(parsed["model"], "gpt-3.5-turbo");
    }
}
