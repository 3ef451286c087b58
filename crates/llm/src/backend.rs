//! LLM backend
//!
//! Ollama chat API in JSON mode. Transient failures (network errors, timeouts,
//! 5xx) are retried with exponential backoff; 4xx responses are returned
//! immediately.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use bruno_config::constants::{endpoints, llm, timeouts};
use bruno_config::LlmSettings;

use crate::prompt::Message;
use crate::LlmError;

/// LLM configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Model name/ID
    pub model: String,
    /// API endpoint
    pub endpoint: String,
    /// Sampling temperature; 0 keeps plans deterministic
    pub temperature: f32,
    /// Per-request timeout
    pub timeout: Duration,
    /// How long Ollama keeps the model loaded between calls ("5m", "-1", "0")
    pub keep_alive: String,
    /// Retry attempts for transient failures
    pub max_retries: u32,
    /// Initial backoff, doubled each retry
    pub initial_backoff: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: llm::MODEL.to_string(),
            endpoint: endpoints::OLLAMA_DEFAULT.to_string(),
            temperature: llm::TEMPERATURE,
            timeout: Duration::from_millis(timeouts::LLM_MS),
            keep_alive: llm::KEEP_ALIVE.to_string(),
            max_retries: 1,
            initial_backoff: Duration::from_millis(250),
        }
    }
}

impl From<&LlmSettings> for LlmConfig {
    fn from(settings: &LlmSettings) -> Self {
        Self {
            model: settings.model.clone(),
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            temperature: settings.temperature,
            timeout: settings.timeout(),
            keep_alive: settings.keep_alive.clone(),
            ..Self::default()
        }
    }
}

/// LLM generation result
#[derive(Debug, Clone)]
pub struct GenerationResult {
    /// Message content as returned by the model
    pub text: String,
    /// Tokens generated
    pub tokens: usize,
    /// Total generation time (ms)
    pub total_time_ms: u64,
    /// Attempts used, including the successful one
    pub attempts: u32,
}

/// LLM Backend trait
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Generate a response
    async fn generate(&self, messages: &[Message]) -> Result<GenerationResult, LlmError>;

    /// Check if the backend is reachable
    async fn is_available(&self) -> bool;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Ollama backend
#[derive(Clone)]
pub struct OllamaBackend {
    client: Client,
    config: LlmConfig,
}

impl OllamaBackend {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn from_settings(settings: &LlmSettings) -> Result<Self, LlmError> {
        Self::new(LlmConfig::from(settings))
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api{}", self.config.endpoint, path)
    }

    fn build_request(&self, messages: &[Message]) -> OllamaChatRequest {
        OllamaChatRequest {
            model: self.config.model.clone(),
            messages: messages.iter().map(OllamaMessage::from).collect(),
            stream: false,
            format: Some("json".to_string()),
            options: Some(OllamaOptions {
                temperature: Some(self.config.temperature),
            }),
            keep_alive: Some(self.config.keep_alive.clone()),
        }
    }

    /// Execute a single request
    async fn execute_request(
        &self,
        request: &OllamaChatRequest,
    ) -> Result<OllamaChatResponse, LlmError> {
        let response = self
            .client
            .post(self.api_url("/chat"))
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().await.unwrap_or_default();
            if status.is_server_error() {
                return Err(LlmError::Network(format!("Server error {}: {}", status, error)));
            }
            return Err(LlmError::Api(format!("{}: {}", status, error)));
        }

        response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))
    }

    fn is_retryable(error: &LlmError) -> bool {
        matches!(error, LlmError::Network(_) | LlmError::Timeout)
    }
}

#[async_trait]
impl LlmBackend for OllamaBackend {
    async fn generate(&self, messages: &[Message]) -> Result<GenerationResult, LlmError> {
        let start = Instant::now();
        let request = self.build_request(messages);

        let mut last_error = None;
        let mut backoff = self.config.initial_backoff;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tracing::warn!(
                    backoff = ?backoff,
                    attempt,
                    max_retries = self.config.max_retries,
                    "LLM request failed, retrying"
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }

            match self.execute_request(&request).await {
                Ok(response) => {
                    let total_time_ms = start.elapsed().as_millis() as u64;
                    tracing::debug!(
                        model = %self.config.model,
                        total_time_ms,
                        done = response.done,
                        "LLM response received"
                    );
                    return Ok(GenerationResult {
                        text: response.message.content,
                        tokens: response.eval_count.unwrap_or(0) as usize,
                        total_time_ms,
                        attempts: attempt + 1,
                    });
                },
                Err(e) if Self::is_retryable(&e) => {
                    last_error = Some(e);
                },
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| LlmError::Network("Max retries exceeded".to_string())))
    }

    async fn is_available(&self) -> bool {
        self.client
            .get(self.api_url("/tags"))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

// Ollama API types
#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    /// "json" constrains the model to emit a JSON value
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    keep_alive: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

impl From<&Message> for OllamaMessage {
    fn from(msg: &Message) -> Self {
        Self {
            role: msg.role.to_string(),
            content: msg.content.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    eval_count: Option<u64>,
}
