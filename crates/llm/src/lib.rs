//! Plan generation through a local LLM
//!
//! Features:
//! - Ollama chat backend in JSON mode with retry on transient failures
//! - Skill-planner system prompt generated from the plan schema
//! - `LlmPlanner`: command text in, raw (untrusted) plan JSON out

pub mod backend;
pub mod planner;
pub mod prompt;

pub use backend::{GenerationResult, LlmBackend, LlmConfig, OllamaBackend};
pub use planner::{extract_json, LlmPlanner};
pub use prompt::{planner_messages, system_prompt, Message, Role, SYSTEM_PROMPT_HEADER};

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<LlmError> for bruno_core::Error {
    fn from(err: LlmError) -> Self {
        bruno_core::Error::Llm(err.to_string())
    }
}
