//! Ollama-compatible chat client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use teleclass_types::LlmSettings;

use crate::error::GeneratorError;
use crate::generator::TextGenerator;
use crate::request::ChatRequest;

/// Configuration for [`OllamaGenerator`].
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Base URL (e.g., "http://localhost:11434")
    pub host: String,

    /// Request timeout
    pub timeout: Duration,

    /// Bearer token, for hosted endpoints behind auth
    pub api_key: Option<SecretString>,
}

impl OllamaConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            timeout: Duration::from_secs(60),
            api_key: None,
        }
    }

    pub fn from_settings(settings: &LlmSettings) -> Self {
        Self {
            host: settings.host.clone(),
            timeout: Duration::from_secs(settings.timeout_secs),
            api_key: settings
                .api_key
                .as_ref()
                .map(|key| SecretString::from(key.clone())),
        }
    }
}

/// Generator backed by an Ollama `/api/chat` endpoint.
pub struct OllamaGenerator {
    client: Client,
    config: OllamaConfig,
}

impl OllamaGenerator {
    pub fn new(config: OllamaConfig) -> Result<Self, GeneratorError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GeneratorError::ConfigError(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.config.host.trim_end_matches('/'))
    }
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    #[serde(flatten)]
    request: &'a ChatRequest,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    #[serde(default)]
    message: Option<OllamaMessage>,
}

#[derive(Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn generate(&self, request: &ChatRequest) -> Result<String, GeneratorError> {
        let body = OllamaChatRequest {
            request,
            stream: false,
        };

        let mut builder = self.client.post(self.chat_url()).json(&body);
        if let Some(key) = &self.config.api_key {
            builder = builder.header(
                "Authorization",
                format!("Bearer {}", key.expose_secret()),
            );
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                GeneratorError::Timeout
            } else {
                GeneratorError::ApiError(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GeneratorError::ApiError(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        let parsed: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| GeneratorError::ParseError(e.to_string()))?;

        let content = parsed.message.map(|m| m.content).unwrap_or_default();
        debug!(chars = content.len(), "Received completion");
        Ok(content)
    }
}
