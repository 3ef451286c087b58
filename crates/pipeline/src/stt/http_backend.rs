//! HTTP STT Backend - calls an external Whisper sidecar
//!
//! The sidecar accepts raw PCM16 little-endian mono audio on
//! `POST {url}/transcribe` and answers with `{"text": ..., "confidence": ...}`.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;

use bruno_config::SttSettings;
use bruno_core::{SpeechToText, Utterance};

use crate::PipelineError;

/// HTTP STT Backend configuration
#[derive(Debug, Clone)]
pub struct HttpSttConfig {
    /// Base URL of the STT service
    pub url: String,
    /// Language code sent in the `X-Language` header
    pub language: String,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
    /// Minimum audio length to process (samples at 16kHz)
    pub min_audio_samples: usize,
}

impl Default for HttpSttConfig {
    fn default() -> Self {
        Self::from(&SttSettings::default())
    }
}

impl From<&SttSettings> for HttpSttConfig {
    fn from(settings: &SttSettings) -> Self {
        Self {
            url: settings.url.trim_end_matches('/').to_string(),
            language: settings.language.clone(),
            timeout_ms: settings.timeout_ms,
            min_audio_samples: settings.min_audio_samples,
        }
    }
}

/// Response from the STT service
#[derive(Debug, Deserialize)]
struct SttResponse {
    #[serde(default)]
    text: String,
    #[serde(default)]
    confidence: f32,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP STT Backend
pub struct HttpSttBackend {
    config: HttpSttConfig,
    client: reqwest::Client,
}

impl HttpSttBackend {
    /// Create a new HTTP STT backend
    pub fn new(config: HttpSttConfig) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| PipelineError::Stt(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &HttpSttConfig {
        &self.config
    }

    /// Probe `{url}/health`; failures are logged, never fatal
    pub async fn health_check(&self) -> bool {
        let health_url = format!("{}/health", self.config.url);
        match self.client.get(&health_url).send().await {
            Ok(resp) if resp.status().is_success() => {
                tracing::info!(
                    url = %self.config.url,
                    language = %self.config.language,
                    "HTTP STT backend connected"
                );
                true
            },
            Ok(resp) => {
                tracing::warn!(status = %resp.status(), "HTTP STT service unhealthy - proceeding anyway");
                false
            },
            Err(e) => {
                tracing::warn!(error = %e, "HTTP STT service not reachable - will retry on first request");
                false
            },
        }
    }

    async fn request(&self, utterance: &Utterance) -> Result<SttResponse, PipelineError> {
        let url = format!("{}/transcribe", self.config.url);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "audio/pcm")
            .header("X-Language", &self.config.language)
            .body(utterance.to_pcm16())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PipelineError::Stt(format!(
                "HTTP STT service returned error: {}",
                response.status()
            )));
        }

        response
            .json::<SttResponse>()
            .await
            .map_err(|e| PipelineError::Stt(format!("Failed to parse STT response: {}", e)))
    }
}

/// Case-fold and trim a raw transcript
fn clean_transcript(text: &str) -> String {
    text.trim().to_lowercase()
}

#[async_trait]
impl SpeechToText for HttpSttBackend {
    async fn transcribe(&self, utterance: &Utterance) -> bruno_core::Result<String> {
        if utterance.samples.len() < self.config.min_audio_samples {
            if !utterance.is_empty() {
                tracing::debug!(samples = utterance.samples.len(), "Utterance too short, skipping STT");
            }
            return Ok(String::new());
        }

        let started = Instant::now();
        let response = self.request(utterance).await?;

        if let Some(error) = &response.error {
            tracing::warn!(error = %error, "STT service returned error");
        }

        let text = clean_transcript(&response.text);
        tracing::debug!(
            text = %text,
            confidence = response.confidence,
            audio = ?utterance.duration(),
            latency_ms = started.elapsed().as_millis() as u64,
            "Transcribed utterance"
        );
        Ok(text)
    }

    fn model_name(&self) -> &str {
        "http-whisper"
    }
}
