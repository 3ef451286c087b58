//! Audio frame and utterance types

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Full-scale value of signed 16-bit PCM.
///
/// Samples are normalized by this value on the way in, and energy is scaled
/// back up by it before threshold comparison.
pub const PCM16_REFERENCE: f32 = 32768.0;

/// Supported audio sample rates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SampleRate {
    /// 8kHz - Telephony
    Hz8000,
    /// 16kHz - Standard speech recognition
    #[default]
    Hz16000,
    /// 22.05kHz
    Hz22050,
    /// 44.1kHz - CD quality
    Hz44100,
    /// 48kHz - Most USB microphones
    Hz48000,
}

impl SampleRate {
    /// Get sample rate as u32
    pub fn as_u32(&self) -> u32 {
        match self {
            SampleRate::Hz8000 => 8000,
            SampleRate::Hz16000 => 16000,
            SampleRate::Hz22050 => 22050,
            SampleRate::Hz44100 => 44100,
            SampleRate::Hz48000 => 48000,
        }
    }

    /// Map a raw device rate onto a supported rate
    pub fn from_u32(rate: u32) -> Option<Self> {
        match rate {
            8000 => Some(SampleRate::Hz8000),
            16000 => Some(SampleRate::Hz16000),
            22050 => Some(SampleRate::Hz22050),
            44100 => Some(SampleRate::Hz44100),
            48000 => Some(SampleRate::Hz48000),
            _ => None,
        }
    }

    /// Number of samples covering `duration` (rounded down)
    pub fn samples_for(&self, duration: Duration) -> usize {
        (self.as_u32() as u128 * duration.as_nanos() / 1_000_000_000) as usize
    }

    /// Exact duration of `samples` mono samples at this rate
    pub fn duration_of(&self, samples: usize) -> Duration {
        Duration::from_nanos((samples as u128 * 1_000_000_000 / self.as_u32() as u128) as u64)
    }
}

/// One fixed-length block of mono audio
///
/// Samples are stored as f32 normalized to [-1.0, 1.0]. Frames are immutable
/// once produced; cloning shares the sample buffer.
#[derive(Clone)]
pub struct AudioFrame {
    /// Normalized samples
    pub samples: Arc<[f32]>,
    /// Sample rate
    pub sample_rate: SampleRate,
    /// Frame sequence number for ordering
    pub sequence: u64,
    /// Monotonic capture timestamp
    pub timestamp: Instant,
    /// Duration of this frame
    pub duration: Duration,
}

impl std::fmt::Debug for AudioFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioFrame")
            .field("samples_len", &self.samples.len())
            .field("sample_rate", &self.sample_rate)
            .field("sequence", &self.sequence)
            .field("duration", &self.duration)
            .finish()
    }
}

impl AudioFrame {
    /// Create a new audio frame from normalized f32 samples
    pub fn new(samples: Vec<f32>, sample_rate: SampleRate, sequence: u64) -> Self {
        Self::with_timestamp(samples, sample_rate, sequence, Instant::now())
    }

    /// Create audio frame with explicit timestamp
    pub fn with_timestamp(
        samples: Vec<f32>,
        sample_rate: SampleRate,
        sequence: u64,
        timestamp: Instant,
    ) -> Self {
        let duration = sample_rate.duration_of(samples.len());
        Self {
            samples: samples.into(),
            sample_rate,
            sequence,
            timestamp,
            duration,
        }
    }

    /// Convert from signed 16-bit samples
    pub fn from_i16(samples: &[i16], sample_rate: SampleRate, sequence: u64) -> Self {
        let normalized = samples
            .iter()
            .map(|&s| f32::from(s) / PCM16_REFERENCE)
            .collect();
        Self::new(normalized, sample_rate, sequence)
    }

    /// Convert from PCM16 bytes (little-endian)
    pub fn from_pcm16(bytes: &[u8], sample_rate: SampleRate, sequence: u64) -> Self {
        let samples: Vec<i16> = bytes
            .chunks_exact(2)
            .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]))
            .collect();
        Self::from_i16(&samples, sample_rate, sequence)
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the frame carries no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Root-mean-square amplitude of the normalized samples
    pub fn rms(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum_squares: f32 = self.samples.iter().map(|s| s * s).sum();
        (sum_squares / self.samples.len() as f32).sqrt()
    }

    /// High-quality resampling using Rubato
    ///
    /// Falls back to linear interpolation for very short frames or when Rubato fails.
    pub fn resample(&self, target_rate: SampleRate) -> Self {
        use rubato::{FftFixedIn, Resampler};

        if self.sample_rate == target_rate {
            return self.clone();
        }

        if self.samples.len() < 64 {
            return self.resample_linear(target_rate);
        }

        let from_rate = self.sample_rate.as_u32() as usize;
        let to_rate = target_rate.as_u32() as usize;
        let samples_f64: Vec<f64> = self.samples.iter().map(|&s| s as f64).collect();

        match FftFixedIn::<f64>::new(from_rate, to_rate, samples_f64.len(), 1, 1) {
            Ok(mut resampler) => {
                let input_frames = vec![samples_f64];
                match resampler.process(&input_frames, None) {
                    Ok(output_frames) => {
                        let resampled: Vec<f32> =
                            output_frames[0].iter().map(|&s| s as f32).collect();
                        Self::with_timestamp(resampled, target_rate, self.sequence, self.timestamp)
                    },
                    Err(e) => {
                        tracing::warn!("Rubato processing failed, using linear fallback: {}", e);
                        self.resample_linear(target_rate)
                    },
                }
            },
            Err(e) => {
                tracing::warn!("Rubato init failed, using linear fallback: {}", e);
                self.resample_linear(target_rate)
            },
        }
    }

    /// Linear interpolation fallback for edge cases
    fn resample_linear(&self, target_rate: SampleRate) -> Self {
        let ratio = target_rate.as_u32() as f64 / self.sample_rate.as_u32() as f64;
        let new_len = (self.samples.len() as f64 * ratio) as usize;

        let mut resampled = Vec::with_capacity(new_len);
        for i in 0..new_len {
            let src_idx = i as f64 / ratio;
            let idx_floor = (src_idx.floor() as usize).min(self.samples.len().saturating_sub(1));
            let idx_ceil = (idx_floor + 1).min(self.samples.len().saturating_sub(1));
            let frac = (src_idx - idx_floor as f64) as f32;

            resampled.push(self.samples[idx_floor] * (1.0 - frac) + self.samples[idx_ceil] * frac);
        }

        Self::with_timestamp(resampled, target_rate, self.sequence, self.timestamp)
    }
}

/// One captured span of audio intended to contain a single spoken command
///
/// Created by the endpointer, consumed once by the recognizer. An empty
/// utterance means the capture window held nothing at all.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    /// Concatenated normalized samples
    pub samples: Vec<f32>,
    /// Sample rate
    pub sample_rate: SampleRate,
    /// Number of frames that contributed samples
    pub frame_count: usize,
}

impl Utterance {
    /// Build an utterance from concatenated samples
    pub fn new(samples: Vec<f32>, sample_rate: SampleRate, frame_count: usize) -> Self {
        Self {
            samples,
            sample_rate,
            frame_count,
        }
    }

    /// Explicit empty result signalling silence
    pub fn empty(sample_rate: SampleRate) -> Self {
        Self::new(Vec::new(), sample_rate, 0)
    }

    /// Whether nothing was captured
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Captured duration
    pub fn duration(&self) -> Duration {
        self.sample_rate.duration_of(self.samples.len())
    }

    /// Largest absolute sample value
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |peak, s| peak.max(s.abs()))
    }

    /// Scale samples down so the peak fits in unit range
    ///
    /// No-op for an all-zero buffer or one already within [-1.0, 1.0].
    pub fn normalize_peak(&mut self) {
        let peak = self.peak();
        if peak > 1.0 {
            for sample in &mut self.samples {
                *sample /= peak;
            }
        }
    }

    /// Convert to PCM16 bytes (little-endian)
    pub fn to_pcm16(&self) -> Vec<u8> {
        const PCM16_SCALE: f32 = 32767.0;

        self.samples
            .iter()
            .flat_map(|&sample| {
                let pcm16 = (sample.clamp(-1.0, 1.0) * PCM16_SCALE) as i16;
                pcm16.to_le_bytes()
            })
            .collect()
    }
}
