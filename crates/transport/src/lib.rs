//! Transport layer for delivering plans to the actuator
//!
//! The actuator accepts one plan per HTTP POST and answers with a short text
//! body. Failures are reported to the caller, never retried here.

pub mod http;

pub use http::{HttpDispatchConfig, HttpDispatcher};

use thiserror::Error;

/// Transport errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Actuator rejected plan with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::Serialization(err.to_string())
    }
}

impl From<TransportError> for bruno_core::Error {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout(ms) => bruno_core::Error::Timeout(ms),
            other => bruno_core::Error::Dispatch(other.to_string()),
        }
    }
}
