use crate::config::Config;
use crate::error::TranslateError;
use crate::retry::{with_retry_if, RetryConfig};
use anyhow::{Context, Result};
use regex::Regex;
use serde_json::Value;
use std::future::Future;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::debug;

/// A remote service that translates one string at a time.
///
/// Implementations are expected to fail often (network, rate limits,
/// unsupported languages); callers turn errors into per-entry outcomes.
pub trait Translator: Send + Sync {
    fn translate(
        &self,
        text: &str,
        target_language: &str,
    ) -> impl Future<Output = Result<String, TranslateError>> + Send;
}

static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();

/// Whether `text` should be sent to a translator at all.
///
/// Blank text has nothing to translate, and interpolation placeholders such
/// as `{{name}}` come back mangled by the service.
pub fn is_translatable(text: &str) -> bool {
    let regex = PLACEHOLDER_REGEX.get_or_init(|| Regex::new(r"\{\{[^{}]*\}\}").unwrap());
    !text.trim().is_empty() && !regex.is_match(text)
}

/// Client for the public Google Translate endpoint (`translate_a/single`).
#[derive(Debug, Clone)]
pub struct GoogleTranslator {
    client: reqwest::Client,
    api_url: String,
    source_language: String,
    retry: RetryConfig,
}

impl GoogleTranslator {
    pub fn new(client: reqwest::Client, api_url: &str, source_language: &str) -> Self {
        Self {
            client,
            api_url: api_url.to_string(),
            source_language: source_language.to_string(),
            retry: RetryConfig::translation(),
        }
    }

    /// Build a translator with its own HTTP client from the run configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent("Mozilla/5.0 (compatible; locale-sync)")
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self::new(client, &config.translate_api_url, &config.source_language))
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn request(&self, text: &str, target_language: &str) -> Result<String, TranslateError> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("client", "gtx"),
                ("sl", self.source_language.as_str()),
                ("tl", target_language),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            return Err(TranslateError::Http { status, body });
        }

        let body = response.text().await?;
        let json: Value = serde_json::from_str(&body)
            .map_err(|e| TranslateError::MalformedResponse(format!("invalid JSON: {}", e)))?;

        join_segments(&json)
    }
}

impl Translator for GoogleTranslator {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, TranslateError> {
        let translated = with_retry_if(
            &self.retry,
            &format!("Translation to {}", target_language),
            || self.request(text, target_language),
            TranslateError::is_retryable,
        )
        .await?;

        debug!("Translated '{}' -> '{}' ({})", text, translated, target_language);
        Ok(translated)
    }
}

/// Concatenate the translated fragments at `[0][*][0]` of a response.
///
/// Longer texts come back split into one segment per sentence.
fn join_segments(json: &Value) -> Result<String, TranslateError> {
    let segments = json
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| TranslateError::MalformedResponse("missing segment array".to_string()))?;

    let translated: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(Value::as_str))
        .collect();

    if translated.is_empty() {
        return Err(TranslateError::EmptyTranslation);
    }
    Ok(translated)
}
