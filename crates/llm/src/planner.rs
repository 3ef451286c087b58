//! Command text to raw plan JSON

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use bruno_config::LlmSettings;
use bruno_core::ActionPlanner;

use crate::backend::{LlmBackend, OllamaBackend};
use crate::prompt::planner_messages;
use crate::LlmError;

/// Pull the JSON value out of a model reply
///
/// JSON mode normally returns a bare object, but some models still wrap it in
/// a ```json fence or add a sentence around it. The outermost `{...}` span is
/// tried when the whole reply does not parse.
pub fn extract_json(content: &str) -> Result<Value, LlmError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(LlmError::InvalidResponse("empty content".to_string()));
    }

    let unfenced = strip_fence(trimmed);
    if let Ok(value) = serde_json::from_str::<Value>(unfenced) {
        return Ok(value);
    }

    match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if start < end => {
            serde_json::from_str(&unfenced[start..=end]).map_err(|e| {
                LlmError::InvalidResponse(format!("content is not JSON: {}", e))
            })
        },
        _ => Err(LlmError::InvalidResponse("no JSON object in content".to_string())),
    }
}

fn strip_fence(content: &str) -> &str {
    let Some(rest) = content.strip_prefix("```") else {
        return content;
    };
    // Skip the info string ("json") up to the first newline
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Planner backed by an LLM
pub struct LlmPlanner {
    backend: Arc<dyn LlmBackend>,
}

impl LlmPlanner {
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self { backend }
    }

    /// Ollama-backed planner from settings
    pub fn from_settings(settings: &LlmSettings) -> Result<Self, LlmError> {
        Ok(Self::new(Arc::new(OllamaBackend::from_settings(settings)?)))
    }

    async fn generate_plan(&self, command: &str) -> Result<Value, LlmError> {
        let messages = planner_messages(command);
        let result = self.backend.generate(&messages).await?;
        tracing::debug!(
            command,
            tokens = result.tokens,
            total_time_ms = result.total_time_ms,
            attempts = result.attempts,
            "Planner replied"
        );
        extract_json(&result.text)
    }
}

#[async_trait]
impl ActionPlanner for LlmPlanner {
    async fn plan(&self, command: &str) -> bruno_core::Result<Value> {
        Ok(self.generate_plan(command).await?)
    }

    fn model_name(&self) -> &str {
        self.backend.model_name()
    }
}
