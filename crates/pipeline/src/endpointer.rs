//! Utterance endpointing
//!
//! Accumulates frames from a start signal until sustained silence or a hard
//! duration ceiling, never ending on silence before the minimum duration.
//!
//! Elapsed time is measured in captured samples rather than wall clock, so
//! the same frame sequence always endpoints the same way. The listener adds a
//! wall-clock deadline on top for the case where frames stop arriving.

use std::time::Duration;

use bruno_config::{AudioSettings, EndpointingSettings};
use bruno_core::{AudioFrame, SampleRate, Utterance};

/// Endpointer state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndpointState {
    /// Below the minimum duration; silence is ignored
    #[default]
    WaitingMin,
    /// Counting consecutive silent frames
    WatchingSilence,
    /// Utterance complete
    Done,
}

/// Endpointing configuration
#[derive(Debug, Clone)]
pub struct EndpointerConfig {
    pub min_duration: Duration,
    pub max_duration: Duration,
    pub silence_hold: Duration,
    pub frame_duration: Duration,
    /// Rate utterances are produced at; frames at other rates are resampled
    pub sample_rate: SampleRate,
}

impl Default for EndpointerConfig {
    fn default() -> Self {
        use bruno_config::constants::{audio, endpointing};

        Self {
            min_duration: Duration::from_millis(endpointing::MIN_UTTERANCE_MS),
            max_duration: Duration::from_millis(endpointing::MAX_UTTERANCE_MS),
            silence_hold: Duration::from_millis(endpointing::SILENCE_HOLD_MS),
            frame_duration: Duration::from_millis(audio::FRAME_MS as u64),
            sample_rate: SampleRate::Hz16000,
        }
    }
}

impl EndpointerConfig {
    pub fn from_settings(audio: &AudioSettings, endpointing: &EndpointingSettings) -> Self {
        let sample_rate = SampleRate::from_u32(audio.sample_rate).unwrap_or_else(|| {
            tracing::warn!(
                sample_rate = audio.sample_rate,
                "Unsupported sample rate, using 16kHz"
            );
            SampleRate::Hz16000
        });

        Self {
            min_duration: endpointing.min_duration(),
            max_duration: endpointing.max_duration(),
            silence_hold: endpointing.silence_hold(),
            frame_duration: audio.frame_duration(),
            sample_rate,
        }
    }

    /// Consecutive silent frames that end an utterance: ceil(hold / frame)
    pub fn silence_frames_needed(&self) -> usize {
        let frame = self.frame_duration.as_nanos().max(1);
        let hold = self.silence_hold.as_nanos();
        ((hold + frame - 1) / frame) as usize
    }
}

/// Utterance endpointer state machine
///
/// One instance covers one capture window; build a fresh one (or `reset`)
/// for the next utterance.
#[derive(Debug)]
pub struct UtteranceEndpointer {
    config: EndpointerConfig,
    state: EndpointState,
    samples: Vec<f32>,
    frame_count: usize,
    silent_run: usize,
    min_samples: usize,
    max_samples: usize,
    silence_frames_needed: usize,
}

impl UtteranceEndpointer {
    pub fn new(config: EndpointerConfig) -> Self {
        let min_samples = config.sample_rate.samples_for(config.min_duration);
        let max_samples = config.sample_rate.samples_for(config.max_duration);
        let silence_frames_needed = config.silence_frames_needed();

        Self {
            samples: Vec::with_capacity(max_samples),
            config,
            state: EndpointState::WaitingMin,
            frame_count: 0,
            silent_run: 0,
            min_samples,
            max_samples,
            silence_frames_needed,
        }
    }

    pub fn state(&self) -> EndpointState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == EndpointState::Done
    }

    pub fn config(&self) -> &EndpointerConfig {
        &self.config
    }

    /// Audio captured so far
    pub fn elapsed(&self) -> Duration {
        self.config.sample_rate.duration_of(self.samples.len())
    }

    /// Current run of consecutive silent frames
    pub fn silent_run(&self) -> usize {
        self.silent_run
    }

    /// Feed one classified frame
    ///
    /// Every frame is buffered, silent or not. Frames pushed after `Done` are
    /// ignored.
    pub fn push(&mut self, frame: &AudioFrame, speaking: bool) -> EndpointState {
        if self.state == EndpointState::Done {
            return self.state;
        }

        let resampled;
        let frame = if frame.sample_rate != self.config.sample_rate {
            resampled = frame.resample(self.config.sample_rate);
            &resampled
        } else {
            frame
        };

        // Never buffer past the ceiling
        let room = self.max_samples.saturating_sub(self.samples.len());
        let take = frame.len().min(room);
        if take > 0 {
            self.samples.extend_from_slice(&frame.samples[..take]);
            self.frame_count += 1;
        }

        let elapsed = self.samples.len();

        if elapsed >= self.min_samples {
            if self.state == EndpointState::WaitingMin {
                tracing::trace!(elapsed_ms = ?self.elapsed(), "Minimum duration reached");
                self.state = EndpointState::WatchingSilence;
            }

            self.silent_run = if speaking { 0 } else { self.silent_run + 1 };
            if self.silent_run >= self.silence_frames_needed {
                tracing::debug!(
                    silent_frames = self.silent_run,
                    elapsed = ?self.elapsed(),
                    "Utterance ended on silence"
                );
                self.state = EndpointState::Done;
            }
        }

        if self.state != EndpointState::Done && elapsed >= self.max_samples {
            tracing::debug!(elapsed = ?self.elapsed(), "Utterance hit maximum duration");
            self.state = EndpointState::Done;
        }

        self.state
    }

    /// Force completion (read deadline or closed source)
    pub fn force_done(&mut self) {
        self.state = EndpointState::Done;
    }

    /// Consume the buffer into a peak-normalized utterance
    ///
    /// An empty buffer yields an explicit empty utterance.
    pub fn finish(&mut self) -> Utterance {
        self.state = EndpointState::Done;

        if self.samples.is_empty() {
            return Utterance::empty(self.config.sample_rate);
        }

        let samples = std::mem::take(&mut self.samples);
        let mut utterance = Utterance::new(samples, self.config.sample_rate, self.frame_count);
        utterance.normalize_peak();
        self.frame_count = 0;
        utterance
    }

    /// Clear the buffer and start a new capture window
    pub fn reset(&mut self) {
        self.state = EndpointState::WaitingMin;
        self.samples.clear();
        self.frame_count = 0;
        self.silent_run = 0;
    }
}
