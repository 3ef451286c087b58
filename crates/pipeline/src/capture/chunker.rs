//! Re-chunking of arbitrary callback blocks into fixed-length frames

use std::time::Duration;

/// Splits a stream of mono sample blocks into blocks of exactly `frame_len`
/// samples, carrying remainders over to the next push
#[derive(Debug)]
pub struct FrameChunker {
    frame_len: usize,
    pending: Vec<f32>,
}

impl FrameChunker {
    pub fn new(frame_len: usize) -> Self {
        let frame_len = frame_len.max(1);
        Self {
            frame_len,
            pending: Vec::with_capacity(frame_len * 2),
        }
    }

    /// Chunker for `frame_duration` frames at a raw device rate
    pub fn for_duration(rate_hz: u32, frame_duration: Duration) -> Self {
        let frame_len = (rate_hz as u128 * frame_duration.as_nanos() / 1_000_000_000) as usize;
        Self::new(frame_len)
    }

    /// Samples per emitted block
    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    /// Samples held back waiting for a full block
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Append samples and return every block they complete
    pub fn push(&mut self, samples: &[f32]) -> Vec<Vec<f32>> {
        self.pending.extend_from_slice(samples);

        let complete = self.pending.len() / self.frame_len;
        if complete == 0 {
            return Vec::new();
        }

        let blocks = self
            .pending
            .chunks_exact(self.frame_len)
            .map(<[f32]>::to_vec)
            .collect();
        self.pending.drain(..complete * self.frame_len);
        blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_blocks() {
        let mut chunker = FrameChunker::for_duration(16_000, Duration::from_millis(30));
        assert_eq!(chunker.frame_len(), 480);

        let blocks = chunker.push(&[0.1; 960]);
        assert_eq!(blocks.len(), 2);
        assert!(blocks.iter().all(|b| b.len() == 480));
        assert_eq!(chunker.pending(), 0);
    }

    #[test]
    fn test_remainder_carries_over() {
        let mut chunker = FrameChunker::new(480);

        assert!(chunker.push(&[0.0; 300]).is_empty());
        assert_eq!(chunker.pending(), 300);

        let mut block = vec![1.0; 200];
        block[179] = 0.5;
        let blocks = chunker.push(&block);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0][299], 0.0);
        assert_eq!(blocks[0][479], 0.5);
        assert_eq!(chunker.pending(), 20);
    }

    #[test]
    fn test_device_rate_lengths() {
        assert_eq!(FrameChunker::for_duration(48_000, Duration::from_millis(30)).frame_len(), 1440);
        assert_eq!(FrameChunker::for_duration(44_100, Duration::from_millis(30)).frame_len(), 1323);
    }
}
