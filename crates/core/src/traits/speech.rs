//! Speech processing traits

use crate::{Result, Utterance};
use async_trait::async_trait;

/// Speech-to-Text interface
///
/// Implementations:
/// - `HttpSttBackend` - Whisper sidecar over HTTP
///
/// # Example
///
/// ```ignore
/// let stt: Box<dyn SpeechToText> = Box::new(HttpSttBackend::new(config)?);
/// let text = stt.transcribe(&utterance).await?;
/// ```
#[async_trait]
pub trait SpeechToText: Send + Sync + 'static {
    /// Transcribe one utterance
    ///
    /// Returns best-effort lowercase text. Empty or silent input yields an
    /// empty string, never an error.
    async fn transcribe(&self, utterance: &Utterance) -> Result<String>;

    /// Get model name for logging
    fn model_name(&self) -> &str;
}
