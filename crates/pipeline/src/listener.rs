//! Capture driver: queued frames in, one utterance out

use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::Instant;

use bruno_config::Settings;
use bruno_core::Utterance;

use crate::capture::FrameQueue;
use crate::endpointer::{EndpointerConfig, UtteranceEndpointer};
use crate::vad::{EnergyGate, VoiceActivityGate};
use crate::PipelineError;

/// Anything that can produce the next utterance on demand
///
/// The controller only depends on this, so tests can script utterances
/// without audio.
#[async_trait]
pub trait UtteranceSource: Send + Sync {
    /// Capture one utterance
    ///
    /// An empty utterance means silence. An error means capture is gone
    /// for good.
    async fn next_utterance(&self) -> Result<Utterance, PipelineError>;
}

/// Runs the endpointer over frames from the capture queue
pub struct Listener {
    queue: Arc<FrameQueue>,
    gate: Box<dyn VoiceActivityGate>,
    config: EndpointerConfig,
}

impl Listener {
    pub fn new(
        queue: Arc<FrameQueue>,
        gate: impl VoiceActivityGate + 'static,
        config: EndpointerConfig,
    ) -> Self {
        Self {
            queue,
            gate: Box::new(gate),
            config,
        }
    }

    pub fn from_settings(queue: Arc<FrameQueue>, settings: &Settings) -> Self {
        Self::new(
            queue,
            EnergyGate::from_settings(&settings.audio),
            EndpointerConfig::from_settings(&settings.audio, &settings.endpointing),
        )
    }

    pub fn config(&self) -> &EndpointerConfig {
        &self.config
    }
}

#[async_trait]
impl UtteranceSource for Listener {
    async fn next_utterance(&self) -> Result<Utterance, PipelineError> {
        let stale = self.queue.clear();
        if stale > 0 {
            tracing::trace!(frames = stale, "Discarded stale frames before capture");
        }

        let mut endpointer = UtteranceEndpointer::new(self.config.clone());
        // One frame of grace so the sample-count ceiling normally fires first
        let deadline = Instant::now() + self.config.max_duration + self.config.frame_duration;

        while !endpointer.is_done() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.queue.recv_timeout(remaining).await {
                Ok(frame) => {
                    let decision = self.gate.classify(&frame);
                    endpointer.push(&frame, decision.speaking);
                },
                Err(PipelineError::Timeout(_)) => {
                    tracing::debug!(elapsed = ?endpointer.elapsed(), "Frame read deadline reached");
                    endpointer.force_done();
                },
                Err(PipelineError::ChannelClosed) if endpointer.elapsed().is_zero() => {
                    return Err(PipelineError::ChannelClosed);
                },
                Err(PipelineError::ChannelClosed) => {
                    tracing::debug!("Capture closed mid-utterance");
                    endpointer.force_done();
                },
                Err(e) => return Err(e),
            }
        }

        let utterance = endpointer.finish();
        tracing::debug!(
            duration = ?utterance.duration(),
            frames = utterance.frame_count,
            dropped_total = self.queue.dropped(),
            "Utterance captured"
        );
        Ok(utterance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::OverflowPolicy;
    use bruno_core::{AudioFrame, SampleRate};
    use std::time::Duration;

    fn listener(queue: Arc<FrameQueue>) -> Listener {
        Listener::new(queue, EnergyGate::new(100.0), EndpointerConfig::default())
    }

    fn spawn_producer(queue: Arc<FrameQueue>, frames: Vec<i16>) {
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1)).await;
            for (sequence, level) in frames.into_iter().enumerate() {
                queue.push(AudioFrame::from_i16(&[level; 480], SampleRate::Hz16000, sequence as u64));
            }
        });
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_frames_are_discarded() {
        let queue = Arc::new(FrameQueue::new(512, OverflowPolicy::DropOldest));
        for sequence in 0..10 {
            queue.push(AudioFrame::from_i16(&[5000; 480], SampleRate::Hz16000, sequence));
        }
        spawn_producer(queue.clone(), vec![0; 80]);

        let utterance = listener(queue).next_utterance().await.unwrap();
        // 50 frames to the floor plus 23 more silent frames
        assert_eq!(utterance.frame_count, 73);
        assert_eq!(utterance.peak(), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_speech_then_silence() {
        let queue = Arc::new(FrameQueue::new(512, OverflowPolicy::DropOldest));
        let mut frames = vec![3000i16; 100];
        frames.extend(vec![0i16; 40]);
        spawn_producer(queue.clone(), frames);

        let utterance = listener(queue).next_utterance().await.unwrap();
        assert_eq!(utterance.frame_count, 124);
        assert!(utterance.peak() > 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_frames_yields_empty_utterance() {
        let queue = Arc::new(FrameQueue::new(16, OverflowPolicy::DropOldest));
        let utterance = listener(queue).next_utterance().await.unwrap();
        assert!(utterance.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_device_finishes_with_buffer() {
        let queue = Arc::new(FrameQueue::new(512, OverflowPolicy::DropOldest));
        spawn_producer(queue.clone(), vec![3000; 20]);

        let utterance = listener(queue).next_utterance().await.unwrap();
        assert_eq!(utterance.frame_count, 20);
    }

    #[tokio::test]
    async fn test_closed_queue_is_an_error() {
        let queue = Arc::new(FrameQueue::new(16, OverflowPolicy::DropOldest));
        queue.close();
        let result = listener(queue).next_utterance().await;
        assert!(matches!(result, Err(PipelineError::ChannelClosed)));
    }
}
