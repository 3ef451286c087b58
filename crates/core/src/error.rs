//! Error types shared across crates

use thiserror::Error;

/// Core error type
///
/// Every library crate keeps its own error enum and converts into this one at
/// the collaborator trait boundary.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("Speech recognition error: {0}")]
    Stt(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Dispatch error: {0}")]
    Dispatch(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
