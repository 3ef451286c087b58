//! Configuration management for the Bruno voice command pipeline
//!
//! Supports loading configuration from:
//! - TOML/YAML files under `config/`
//! - Environment variables (BRUNO__ prefix)
//! - Built-in defaults from [`constants`]

pub mod constants;
pub mod settings;

pub use settings::{
    load_settings, AudioSettings, ControllerSettings, DispatchSettings, EndpointingSettings,
    LlmSettings, ObservabilityConfig, OverflowMode, Settings, SttSettings, WakeSettings,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
