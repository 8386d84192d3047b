//! AI text completion capability.
//!
//! Engines depend only on [`CompletionProvider`]; [`OpenRouterClient`] is the
//! production implementation over the OpenAI-compatible chat API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::json;
use tracing::{debug, instrument};

use reportsmith_shared::{OpenRouterConfig, ReportError, Result};

/// Why a completion call failed.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    /// The configured model does not exist upstream.
    #[error("model not found: {model}")]
    ModelNotFound { model: String },

    /// The API key was rejected or missing.
    #[error("API key rejected: {0}")]
    Auth(String),

    #[error("completion timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// Any other non-success status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),

    /// The reply did not contain completion text.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for CompletionError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.to_string())
    }
}

/// A text-in, text-out model.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Identifier of the model in use.
    fn model(&self) -> &str;

    /// Send one prompt and return the completion text.
    async fn complete(&self, prompt: &str) -> std::result::Result<String, CompletionError>;

    /// Model identifiers available to this provider.
    async fn list_models(&self) -> std::result::Result<Vec<String>, CompletionError> {
        Ok(Vec::new())
    }
}

/// Run a completion bounded by `timeout`. Never retries.
pub async fn complete_with_timeout(
    provider: &dyn CompletionProvider,
    prompt: &str,
    timeout: Duration,
) -> std::result::Result<String, CompletionError> {
    debug!(model = provider.model(), prompt_chars = prompt.len(), "completion request");
    match tokio::time::timeout(timeout, provider.complete(prompt)).await {
        Ok(result) => result,
        Err(_) => Err(CompletionError::Timeout(timeout)),
    }
}

// ---------------------------------------------------------------------------
// OpenRouter
// ---------------------------------------------------------------------------

/// OpenRouter (or any OpenAI-compatible) chat completions client.
pub struct OpenRouterClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenRouterClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("reportsmith/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ReportError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Build a client from `[openrouter]` config, reading the key from the
    /// configured environment variable.
    pub fn from_config(config: &OpenRouterConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                ReportError::config(format!(
                    "OpenRouter API key not found. Set the {} environment variable.",
                    config.api_key_env
                ))
            })?;
        Self::new(api_key, &config.default_model, &config.base_url)
    }
}

#[async_trait]
impl CompletionProvider for OpenRouterClient {
    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip_all, fields(model = %self.model))]
    async fn complete(&self, prompt: &str) -> std::result::Result<String, CompletionError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        match status {
            StatusCode::NOT_FOUND => {
                return Err(CompletionError::ModelNotFound {
                    model: self.model.clone(),
                });
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                let text = resp.text().await.unwrap_or_default();
                return Err(CompletionError::Auth(text));
            }
            s if !s.is_success() => {
                let text = resp.text().await.unwrap_or_default();
                return Err(CompletionError::Http {
                    status: s.as_u16(),
                    body: text,
                });
            }
            _ => {}
        }

        let value: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| CompletionError::InvalidResponse(e.to_string()))?;

        value["choices"]
            .as_array()
            .and_then(|choices| choices.first())
            .and_then(|choice| choice["message"]["content"].as_str())
            .map(str::to_string)
            .ok_or_else(|| CompletionError::InvalidResponse("missing choices[0].message.content".into()))
    }

    async fn list_models(&self) -> std::result::Result<Vec<String>, CompletionError> {
        let url = format!("{}/models", self.base_url);
        let resp = self.client.get(&url).bearer_auth(&self.api_key).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(CompletionError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        let value: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| CompletionError::InvalidResponse(e.to_string()))?;

        Ok(value["data"]
            .as_array()
            .map(|models| {
                models
                    .iter()
                    .filter_map(|m| m["id"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> OpenRouterClient {
        OpenRouterClient::new("test-key", "acme/model-1", server.uri()).unwrap()
    }

    fn reply(text: &str) -> serde_json::Value {
        json!({ "choices": [{ "message": { "role": "assistant", "content": text } }] })
    }

    #[tokio::test]
    async fn complete_returns_message_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("Hello there")))
            .expect(1)
            .mount(&server)
            .await;

        let text = client(&server).complete("Say hello").await.unwrap();
        assert_eq!(text, "Hello there");
    }

    #[tokio::test]
    async fn status_codes_are_classified() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let err = client(&server).complete("x").await.unwrap_err();
        assert!(matches!(err, CompletionError::ModelNotFound { ref model } if model == "acme/model-1"));

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("no key"))
            .mount(&server)
            .await;
        let err = client(&server).complete("x").await.unwrap_err();
        assert!(matches!(err, CompletionError::Auth(_)));

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .mount(&server)
            .await;
        let err = client(&server).complete("x").await.unwrap_err();
        assert!(matches!(err, CompletionError::Http { status: 503, ref body } if body == "busy"));
    }

    #[tokio::test]
    async fn missing_content_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let err = client(&server).complete("x").await.unwrap_err();
        assert!(matches!(err, CompletionError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn list_models_reads_ids() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "id": "a/one" }, { "id": "b/two" }, { "name": "no id" }]
            })))
            .mount(&server)
            .await;

        let models = client(&server).list_models().await.unwrap();
        assert_eq!(models, vec!["a/one", "b/two"]);
    }

    #[tokio::test]
    async fn slow_completion_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(reply("late"))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let client = client(&server);
        let err = complete_with_timeout(&client, "x", Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::Timeout(_)));
    }

    #[test]
    fn from_config_requires_key() {
        let config = OpenRouterConfig {
            api_key_env: "REPORTSMITH_TEST_KEY_THAT_IS_NOT_SET".into(),
            ..Default::default()
        };
        let err = OpenRouterClient::from_config(&config).err().unwrap();
        assert!(matches!(err, ReportError::Config { .. }));
    }
}
