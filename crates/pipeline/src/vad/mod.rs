//! Voice Activity Detection
//!
//! A frame is speech when its RMS, rescaled to the signed 16-bit range,
//! exceeds the configured energy threshold. Stateless: the endpointer owns
//! any run-length logic built on top of the per-frame decision.

use bruno_config::AudioSettings;
use bruno_core::audio::PCM16_REFERENCE;
use bruno_core::AudioFrame;

/// Per-frame classification
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VadDecision {
    pub speaking: bool,
    /// RMS on the PCM16 scale
    pub energy: f32,
}

/// VAD engine trait for pluggable implementations
pub trait VoiceActivityGate: Send + Sync {
    /// Classify a single audio frame
    fn classify(&self, frame: &AudioFrame) -> VadDecision;
}

/// Energy threshold gate
#[derive(Debug, Clone, Copy)]
pub struct EnergyGate {
    threshold: f32,
}

impl EnergyGate {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn from_settings(settings: &AudioSettings) -> Self {
        Self::new(settings.energy_threshold)
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// RMS of normalized samples rescaled to the PCM16 reference range
    pub fn energy(frame: &AudioFrame) -> f32 {
        frame.rms() * PCM16_REFERENCE
    }
}

impl VoiceActivityGate for EnergyGate {
    fn classify(&self, frame: &AudioFrame) -> VadDecision {
        let energy = Self::energy(frame);
        VadDecision {
            speaking: energy > self.threshold,
            energy,
        }
    }
}
