//! Audio capture
//!
//! A [`FrameSource`] owns the input device and pushes fixed-length frames into
//! a shared [`FrameQueue`]. The source runs independently of the consumer;
//! dropping the returned [`CaptureHandle`] stops it.

mod chunker;
#[cfg(feature = "capture")]
mod device;
mod queue;

pub use chunker::FrameChunker;
#[cfg(feature = "capture")]
pub use device::{list_input_devices, CpalFrameSource};
pub use queue::{FrameQueue, OverflowPolicy};

use std::any::Any;
use std::sync::Arc;

use crate::PipelineError;

/// Keeps a running capture alive
///
/// Holds whatever the backend needs to keep streaming (a device stream, a
/// thread guard). Capture stops when the handle is dropped.
pub struct CaptureHandle {
    label: String,
    _guard: Box<dyn Any>,
}

impl CaptureHandle {
    pub fn new(label: impl Into<String>, guard: impl Any) -> Self {
        Self {
            label: label.into(),
            _guard: Box::new(guard),
        }
    }

    /// Device or source description
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Stop capturing
    pub fn stop(self) {
        tracing::debug!(source = %self.label, "Capture stopped");
    }
}

impl std::fmt::Debug for CaptureHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureHandle").field("label", &self.label).finish()
    }
}

/// Producer of timestamped audio frames
pub trait FrameSource {
    /// Start pushing frames into `queue`
    ///
    /// Failure here is fatal at startup.
    fn start(&self, queue: Arc<FrameQueue>) -> Result<CaptureHandle, PipelineError>;

    /// Source name for logging
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use bruno_core::{AudioFrame, SampleRate};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    /// Feeds a fixed block of samples from a background thread
    struct ToneSource {
        samples: Vec<f32>,
    }

    struct StopOnDrop(Arc<AtomicBool>);

    impl Drop for StopOnDrop {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    impl FrameSource for ToneSource {
        fn start(&self, queue: Arc<FrameQueue>) -> Result<CaptureHandle, PipelineError> {
            let stop = Arc::new(AtomicBool::new(false));
            let samples = self.samples.clone();
            let flag = stop.clone();
            std::thread::spawn(move || {
                let mut chunker = FrameChunker::for_duration(16_000, Duration::from_millis(30));
                for (sequence, block) in chunker.push(&samples).into_iter().enumerate() {
                    if flag.load(Ordering::SeqCst) {
                        break;
                    }
                    queue.push(AudioFrame::new(block, SampleRate::Hz16000, sequence as u64));
                }
            });
            Ok(CaptureHandle::new("tone", StopOnDrop(stop)))
        }

        fn name(&self) -> &str {
            "tone"
        }
    }

    #[tokio::test]
    async fn test_source_feeds_queue() {
        let queue = Arc::new(FrameQueue::new(16, OverflowPolicy::DropOldest));
        let source = ToneSource {
            samples: vec![0.25; 480 * 3],
        };

        let handle = source.start(queue.clone()).unwrap();
        assert_eq!(handle.label(), "tone");

        for expected in 0..3 {
            let frame = queue.recv_timeout(Duration::from_secs(1)).await.unwrap();
            assert_eq!(frame.sequence, expected);
            assert_eq!(frame.len(), 480);
        }
        handle.stop();
    }
}
