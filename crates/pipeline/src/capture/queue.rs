//! Bounded frame queue between the capture producer and the pipeline consumer
//!
//! The producer side is synchronous (it runs inside the audio callback) and
//! never waits longer than the configured block timeout. The consumer side is
//! async.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tokio::sync::Notify;

use bruno_config::{AudioSettings, OverflowMode};
use bruno_core::AudioFrame;

use crate::PipelineError;

/// Behaviour when a frame arrives at a full queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Evict the oldest frame; push never waits
    #[default]
    DropOldest,
    /// Wait up to `timeout` for room, then drop the incoming frame
    Block { timeout: Duration },
}

impl OverflowPolicy {
    pub fn from_settings(settings: &AudioSettings) -> Self {
        match settings.overflow {
            OverflowMode::DropOldest => OverflowPolicy::DropOldest,
            OverflowMode::Block => OverflowPolicy::Block {
                timeout: settings.block_timeout(),
            },
        }
    }
}

#[derive(Debug)]
struct QueueInner {
    frames: VecDeque<AudioFrame>,
    closed: bool,
}

/// Bounded frame queue
#[derive(Debug)]
pub struct FrameQueue {
    inner: Mutex<QueueInner>,
    /// Signalled when room frees up (blocking producers)
    space: Condvar,
    /// Signalled when a frame arrives or the queue closes (async consumer)
    available: Notify,
    capacity: usize,
    policy: OverflowPolicy,
    dropped: AtomicU64,
}

impl FrameQueue {
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(QueueInner {
                frames: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            space: Condvar::new(),
            available: Notify::new(),
            capacity,
            policy,
            dropped: AtomicU64::new(0),
        }
    }

    pub fn from_settings(settings: &AudioSettings) -> Self {
        Self::new(settings.queue_capacity, OverflowPolicy::from_settings(settings))
    }

    /// Enqueue a frame from the producer
    ///
    /// Returns false when the frame was not queued (queue closed, or full
    /// under the blocking policy after the timeout).
    pub fn push(&self, frame: AudioFrame) -> bool {
        let mut inner = self.inner.lock();
        if inner.closed {
            return false;
        }

        if inner.frames.len() >= self.capacity {
            match self.policy {
                OverflowPolicy::DropOldest => {
                    inner.frames.pop_front();
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                },
                OverflowPolicy::Block { timeout } => {
                    let deadline = Instant::now() + timeout;
                    while inner.frames.len() >= self.capacity && !inner.closed {
                        if self.space.wait_until(&mut inner, deadline).timed_out() {
                            break;
                        }
                    }
                    if inner.closed {
                        return false;
                    }
                    if inner.frames.len() >= self.capacity {
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                        return false;
                    }
                },
            }
        }

        inner.frames.push_back(frame);
        drop(inner);
        self.available.notify_one();
        true
    }

    /// Dequeue without waiting
    pub fn try_pop(&self) -> Option<AudioFrame> {
        let frame = self.inner.lock().frames.pop_front();
        if frame.is_some() {
            self.space.notify_one();
        }
        frame
    }

    /// Wait for the next frame; `None` once closed and drained
    pub async fn recv(&self) -> Option<AudioFrame> {
        loop {
            let notified = self.available.notified();
            {
                let mut inner = self.inner.lock();
                if let Some(frame) = inner.frames.pop_front() {
                    drop(inner);
                    self.space.notify_one();
                    return Some(frame);
                }
                if inner.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Wait for the next frame for at most `timeout`
    pub async fn recv_timeout(&self, timeout: Duration) -> Result<AudioFrame, PipelineError> {
        match tokio::time::timeout(timeout, self.recv()).await {
            Ok(Some(frame)) => Ok(frame),
            Ok(None) => Err(PipelineError::ChannelClosed),
            Err(_) => Err(PipelineError::Timeout(timeout.as_millis() as u64)),
        }
    }

    /// Discard queued frames, returning how many were dropped
    pub fn clear(&self) -> usize {
        let cleared = {
            let mut inner = self.inner.lock();
            let count = inner.frames.len();
            inner.frames.clear();
            count
        };
        self.space.notify_all();
        cleared
    }

    /// Stop accepting frames and wake all waiters
    pub fn close(&self) {
        self.inner.lock().closed = true;
        self.space.notify_all();
        self.available.notify_waiters();
        self.available.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    /// Frames lost to overflow since creation
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
