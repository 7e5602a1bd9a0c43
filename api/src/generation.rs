//! Client for the hosted text-generation service.
//!
//! Handlers depend on the [`TextGenerator`] trait only; the concrete client is
//! chosen once in `main` from environment configuration.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_TIMEOUT_MS: u64 = 20_000;
const MIN_TIMEOUT_MS: u64 = 1_000;
const MAX_TIMEOUT_MS: u64 = 120_000;
const MAX_ERROR_BODY_CHARS: usize = 500;

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("text generation is not configured")]
    NotConfigured,
    #[error("text generation timed out")]
    Timeout,
    #[error("text generation request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("text generation returned status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("text generation response could not be decoded: {0}")]
    Decode(String),
    #[error("text generation returned no text")]
    EmptyResponse,
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GenerationError::Timeout
        } else {
            GenerationError::Transport(err)
        }
    }
}

/// A service that turns a prompt into free text. No schema is enforced on the output.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Short identifier for logs and health output.
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl GenerationConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let timeout_ms = non_empty("MOODLOG_GENERATION_TIMEOUT_MS")
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_MS)
            .clamp(MIN_TIMEOUT_MS, MAX_TIMEOUT_MS);

        Self {
            api_key: non_empty("MOODLOG_GENERATION_API_KEY").or_else(|| non_empty("GEMINI_API_KEY")),
            model: non_empty("MOODLOG_GENERATION_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: non_empty("MOODLOG_GENERATION_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout: Duration::from_millis(timeout_ms),
        }
    }
}

/// Build the process-wide generator. Missing configuration yields a generator
/// that always fails, so every analysis uses the fallback.
pub fn build_generator(config: GenerationConfig) -> Arc<dyn TextGenerator> {
    let Some(api_key) = config.api_key.clone() else {
        tracing::warn!("No text-generation API key configured; analyses will use fallback results");
        return Arc::new(UnavailableGenerator);
    };

    match GeminiGenerator::new(api_key, config.model, config.base_url, config.timeout) {
        Ok(generator) => {
            tracing::info!(model = %generator.model, "Text generation enabled");
            Arc::new(generator)
        }
        Err(err) => {
            tracing::error!(error = %err, "Failed to build text-generation client; using fallback results");
            Arc::new(UnavailableGenerator)
        }
    }
}

/// Generator used when no service is configured.
pub struct UnavailableGenerator;

#[async_trait]
impl TextGenerator for UnavailableGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        Err(GenerationError::NotConfigured)
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}

/// Google Generative Language `generateContent` client.
pub struct GeminiGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiGenerator {
    pub fn new(
        api_key: String,
        model: String,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            model,
            base_url,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let payload = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(MAX_ERROR_BODY_CHARS)
                .collect();
            return Err(GenerationError::Status { status, body });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| GenerationError::Decode(err.to_string()))?;
        response_text(&body).ok_or(GenerationError::EmptyResponse)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// Concatenate the text parts of the first candidate.
fn response_text(body: &Value) -> Option<String> {
    let parts = body
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    (!text.trim().is_empty()).then_some(text)
}

#[cfg(test)]
pub mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Generator returning a canned reply (or a timeout) and recording prompts.
    pub struct StubGenerator {
        reply: Option<String>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl StubGenerator {
        pub fn replying(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn failing() -> Self {
            Self {
                reply: None,
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn recorded_prompts(&self) -> Vec<String> {
            self.prompts.lock().expect("prompt lock").clone()
        }
    }

    #[async_trait]
    impl TextGenerator for StubGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
            self.prompts
                .lock()
                .expect("prompt lock")
                .push(prompt.to_string());
            self.reply.clone().ok_or(GenerationError::Timeout)
        }

        fn name(&self) -> &str {
            "stub"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> GenerationConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        GenerationConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn config_defaults_without_key() {
        let config = config_from(&[]);
        assert_eq!(config.api_key, None);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Duration::from_millis(DEFAULT_TIMEOUT_MS));
    }

    #[test]
    fn config_prefers_moodlog_key_and_clamps_timeout() {
        let config = config_from(&[
            ("GEMINI_API_KEY", "fallback-key"),
            ("MOODLOG_GENERATION_API_KEY", "primary-key"),
            ("MOODLOG_GENERATION_TIMEOUT_MS", "5"),
            ("MOODLOG_GENERATION_BASE_URL", "http://localhost:8080/"),
        ]);
        assert_eq!(config.api_key.as_deref(), Some("primary-key"));
        assert_eq!(config.timeout, Duration::from_millis(MIN_TIMEOUT_MS));
        assert_eq!(config.base_url, "http://localhost:8080");
    }

    #[test]
    fn config_ignores_blank_values() {
        let config = config_from(&[
            ("MOODLOG_GENERATION_API_KEY", "   "),
            ("GEMINI_API_KEY", "gemini-key"),
            ("MOODLOG_GENERATION_TIMEOUT_MS", "soon"),
        ]);
        assert_eq!(config.api_key.as_deref(), Some("gemini-key"));
        assert_eq!(config.timeout, Duration::from_millis(DEFAULT_TIMEOUT_MS));
    }

    #[test]
    fn response_text_joins_parts_of_first_candidate() {
        let body = json!({
            "candidates": [
                {"content": {"parts": [{"text": "{\"energy_level\": "}, {"text": "40}"}]}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        });
        assert_eq!(response_text(&body).as_deref(), Some("{\"energy_level\": 40}"));
    }

    #[test]
    fn response_text_rejects_missing_or_blank_text() {
        assert_eq!(response_text(&json!({"candidates": []})), None);
        assert_eq!(response_text(&json!({"promptFeedback": {"blockReason": "SAFETY"}})), None);
        assert_eq!(
            response_text(&json!({"candidates": [{"content": {"parts": [{"text": "  "}]}}]})),
            None
        );
    }

    #[tokio::test]
    async fn unconfigured_generator_always_fails() {
        let generator = build_generator(config_from(&[]));
        assert_eq!(generator.name(), "unavailable");
        let err = generator
            .generate("anything")
            .await
            .expect_err("unconfigured generator must fail");
        assert!(matches!(err, GenerationError::NotConfigured));
    }

    #[test]
    fn endpoint_includes_model() {
        let generator = GeminiGenerator::new(
            "key".to_string(),
            "gemini-test".to_string(),
            "http://localhost:9999".to_string(),
            Duration::from_secs(1),
        )
        .expect("client should build");
        assert_eq!(
            generator.endpoint(),
            "http://localhost:9999/v1beta/models/gemini-test:generateContent"
        );
    }
}
