//! Microphone capture through cpal
//!
//! Opens the configured (or default) input device with its native config,
//! down-mixes to mono, re-chunks to fixed frames at the device rate and
//! resamples each frame to the pipeline rate with a streaming resampler.

use std::sync::Arc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use rubato::{FftFixedIn, Resampler};

use bruno_config::AudioSettings;
use bruno_core::{AudioFrame, SampleRate};

use super::{CaptureHandle, FrameChunker, FrameQueue, FrameSource};
use crate::PipelineError;

/// Input device frame source
#[derive(Debug, Clone)]
pub struct CpalFrameSource {
    device_name: Option<String>,
    frame_duration: Duration,
    target_rate: SampleRate,
}

impl CpalFrameSource {
    pub fn new(device_name: Option<String>, frame_duration: Duration, target_rate: SampleRate) -> Self {
        Self {
            device_name,
            frame_duration,
            target_rate,
        }
    }

    pub fn from_settings(settings: &AudioSettings) -> Self {
        Self::new(
            settings.device.clone(),
            settings.frame_duration(),
            SampleRate::from_u32(settings.sample_rate).unwrap_or_default(),
        )
    }
}

/// Names of the available input devices
pub fn list_input_devices() -> Result<Vec<String>, PipelineError> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .map_err(|e| PipelineError::Device(format!("Failed to enumerate input devices: {}", e)))?;

    Ok(devices
        .enumerate()
        .map(|(index, device)| device.name().unwrap_or_else(|_| format!("Microphone {}", index + 1)))
        .collect())
}

fn resolve_input_device(host: &cpal::Host, name: Option<&str>) -> Result<cpal::Device, PipelineError> {
    if let Some(wanted) = name.map(str::trim).filter(|n| !n.is_empty()) {
        let mut devices = host
            .input_devices()
            .map_err(|e| PipelineError::Device(format!("Failed to enumerate input devices: {}", e)))?;
        return devices
            .find(|device| device.name().map(|n| n == wanted).unwrap_or(false))
            .ok_or_else(|| PipelineError::Device(format!("Input device not found: {}", wanted)));
    }

    host.default_input_device()
        .ok_or_else(|| PipelineError::Device("No input device available".to_string()))
}

/// Turns device callback blocks into pipeline frames
struct FramePump {
    chunker: FrameChunker,
    resampler: Option<FftFixedIn<f32>>,
    target_rate: SampleRate,
    queue: Arc<FrameQueue>,
    sequence: u64,
}

impl FramePump {
    fn new(
        device_rate: u32,
        frame_duration: Duration,
        target_rate: SampleRate,
        queue: Arc<FrameQueue>,
    ) -> Result<Self, PipelineError> {
        let chunker = FrameChunker::for_duration(device_rate, frame_duration);

        let resampler = if device_rate == target_rate.as_u32() {
            None
        } else {
            let resampler = FftFixedIn::<f32>::new(
                device_rate as usize,
                target_rate.as_u32() as usize,
                chunker.frame_len(),
                1,
                1,
            )
            .map_err(|e| PipelineError::Audio(format!("Resampler init failed: {}", e)))?;
            Some(resampler)
        };

        Ok(Self {
            chunker,
            resampler,
            target_rate,
            queue,
            sequence: 0,
        })
    }

    fn feed(&mut self, mono: &[f32]) {
        for block in self.chunker.push(mono) {
            let samples = match self.resampler.as_mut() {
                None => block,
                Some(resampler) => match resampler.process(&[block.as_slice()], None) {
                    Ok(mut output) => output.pop().unwrap_or_default(),
                    Err(e) => {
                        tracing::warn!(error = %e, "Resampling failed, frame dropped");
                        continue;
                    },
                },
            };
            if samples.is_empty() {
                continue;
            }

            let frame = AudioFrame::new(samples, self.target_rate, self.sequence);
            self.sequence += 1;
            if !self.queue.push(frame) {
                tracing::trace!(sequence = self.sequence, "Frame not queued");
            }
        }
    }
}

fn interleaved_to_mono<T: Copy>(input: &[T], channels: usize, convert: impl Fn(T) -> f32) -> Vec<f32> {
    if channels <= 1 {
        return input.iter().map(|&s| convert(s)).collect();
    }

    input
        .chunks_exact(channels)
        .map(|frame| frame.iter().map(|&s| convert(s)).sum::<f32>() / channels as f32)
        .collect()
}

fn i16_to_f32(sample: i16) -> f32 {
    f32::from(sample) / bruno_core::audio::PCM16_REFERENCE
}

fn u16_to_f32(sample: u16) -> f32 {
    (f32::from(sample) / u16::MAX as f32) * 2.0 - 1.0
}

impl FrameSource for CpalFrameSource {
    fn start(&self, queue: Arc<FrameQueue>) -> Result<CaptureHandle, PipelineError> {
        let host = cpal::default_host();
        let device = resolve_input_device(&host, self.device_name.as_deref())?;
        let label = device.name().unwrap_or_else(|_| "unknown input".to_string());

        let supported = device
            .default_input_config()
            .map_err(|e| PipelineError::Device(format!("Failed to get default input config: {}", e)))?;
        let sample_format = supported.sample_format();
        let stream_config = supported.config();
        let device_rate = stream_config.sample_rate.0;
        let channels = usize::from(stream_config.channels.max(1));

        tracing::info!(
            device = %label,
            device_rate,
            channels,
            format = ?sample_format,
            target_rate = self.target_rate.as_u32(),
            "Opening input device"
        );

        let mut pump = FramePump::new(device_rate, self.frame_duration, self.target_rate, queue)?;

        let error_callback = |e: cpal::StreamError| {
            tracing::warn!(error = %e, "Input stream error");
        };

        let stream = match sample_format {
            SampleFormat::F32 => device.build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    pump.feed(&interleaved_to_mono(data, channels, |s| s));
                },
                error_callback,
                None,
            ),
            SampleFormat::I16 => device.build_input_stream(
                &stream_config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    pump.feed(&interleaved_to_mono(data, channels, i16_to_f32));
                },
                error_callback,
                None,
            ),
            SampleFormat::U16 => device.build_input_stream(
                &stream_config,
                move |data: &[u16], _: &cpal::InputCallbackInfo| {
                    pump.feed(&interleaved_to_mono(data, channels, u16_to_f32));
                },
                error_callback,
                None,
            ),
            other => {
                return Err(PipelineError::Device(format!(
                    "Unsupported input sample format: {:?}",
                    other
                )))
            },
        }
        .map_err(|e| PipelineError::Device(format!("Failed to build input stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| PipelineError::Device(format!("Failed to start input stream: {}", e)))?;

        Ok(CaptureHandle::new(label, stream))
    }

    fn name(&self) -> &str {
        self.device_name.as_deref().unwrap_or("default")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::OverflowPolicy;

    #[test]
    fn test_interleaved_to_mono() {
        let stereo = [0.5f32, -0.5, 1.0, 0.0];
        assert_eq!(interleaved_to_mono(&stereo, 2, |s| s), vec![0.0, 0.5]);

        let mono = [i16::MIN, 0];
        assert_eq!(interleaved_to_mono(&mono, 1, i16_to_f32), vec![-1.0, 0.0]);
    }

    #[test]
    fn test_pump_resamples_to_target_rate() {
        let queue = Arc::new(FrameQueue::new(64, OverflowPolicy::DropOldest));
        let mut pump =
            FramePump::new(48_000, Duration::from_millis(30), SampleRate::Hz16000, queue.clone()).unwrap();

        pump.feed(&vec![0.1; 1440 * 10]);

        let mut total = 0;
        while let Some(frame) = queue.try_pop() {
            assert_eq!(frame.sample_rate, SampleRate::Hz16000);
            total += frame.len();
        }
        assert!(total > 480 * 5 && total <= 480 * 10);
    }

    #[test]
    fn test_pump_passthrough_at_target_rate() {
        let queue = Arc::new(FrameQueue::new(64, OverflowPolicy::DropOldest));
        let mut pump =
            FramePump::new(16_000, Duration::from_millis(30), SampleRate::Hz16000, queue.clone()).unwrap();

        pump.feed(&[0.1; 1000]);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.try_pop().unwrap().sequence, 0);
        assert_eq!(queue.try_pop().unwrap().sequence, 1);
    }
}
