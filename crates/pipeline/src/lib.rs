//! Audio pipeline for the Bruno voice command loop
//!
//! This crate provides everything between the microphone and a transcript:
//! - Energy-based voice activity gate
//! - Utterance endpointing (min floor, silence hold, max ceiling)
//! - Wake phrase matching with debounce
//! - Bounded frame queue fed by a capture source
//! - Listener that turns queued frames into utterances
//! - HTTP speech-to-text backend

pub mod capture;
pub mod endpointer;
pub mod listener;
pub mod stt;
pub mod vad;
pub mod wake;

// Capture exports
pub use capture::{CaptureHandle, FrameChunker, FrameQueue, FrameSource, OverflowPolicy};
#[cfg(feature = "capture")]
pub use capture::CpalFrameSource;

// Endpointing exports
pub use endpointer::{EndpointState, EndpointerConfig, UtteranceEndpointer};

// Listener exports
pub use listener::{Listener, UtteranceSource};

// STT exports
pub use stt::{HttpSttBackend, HttpSttConfig};

// VAD exports
pub use vad::{EnergyGate, VadDecision, VoiceActivityGate};

// Wake exports
pub use wake::{WakeConfig, WakeGate, WakeOutcome, WakeState};

use thiserror::Error;

/// Pipeline errors
#[derive(Error, Debug, Clone)]
pub enum PipelineError {
    #[error("STT error: {0}")]
    Stt(String),

    #[error("Capture device error: {0}")]
    Device(String),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Channel closed")]
    ChannelClosed,

    #[error("Timeout after {0}ms")]
    Timeout(u64),
}

impl From<PipelineError> for bruno_core::Error {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Stt(msg) => bruno_core::Error::Stt(msg),
            PipelineError::Timeout(ms) => bruno_core::Error::Timeout(ms),
            other => bruno_core::Error::Pipeline(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PipelineError::Stt(format!("Request timed out: {}", err))
        } else {
            PipelineError::Stt(err.to_string())
        }
    }
}
