//! The announcement chain buffer.
//!
//! Decoded clips are concatenated into one interleaved sample buffer so they
//! can be played back as a single gapless stream. Storage is grown by doubling
//! and is kept across `reset()` so that building many short chains stays
//! amortized-linear and does not allocate once warmed up.

use tracing::debug;

use super::decoder::{AudioSegment, PcmFormat};
use super::error::SoundError;

/// Smallest capacity allocated on first growth, in frames.
pub const MIN_CAPACITY_FRAMES: usize = 4096;

/// Ordered concatenation of PCM segments sharing one format.
#[derive(Debug, Default)]
pub struct AudioChain {
    /// Interleaved samples; `len() == frames_queued * channels`
    samples: Vec<i16>,
    frames_queued: usize,
    capacity_frames: usize,
    /// Format adopted from the first segment since the last reset
    format: Option<PcmFormat>,
    /// Number of times the backing storage has been grown
    growths: usize,
}

impl AudioChain {
    /// Creates an empty chain with no storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a decoded segment.
    ///
    /// An empty chain adopts the segment's format. On any error the chain is
    /// left exactly as it was.
    ///
    /// # Errors
    ///
    /// - `SoundError::FormatMismatch` if the chain holds frames of another format
    /// - `SoundError::Allocation` if the buffer cannot be grown
    pub fn append(&mut self, segment: &AudioSegment) -> Result<(), SoundError> {
        let format = match self.format {
            Some(current) if self.frames_queued > 0 => {
                if current != segment.format {
                    return Err(SoundError::FormatMismatch {
                        expected: current,
                        found: segment.format,
                    });
                }
                current
            }
            _ => segment.format,
        };

        let channels = usize::from(format.channels.max(1));
        let capacity = if self.format.map(|f| f.channels) == Some(format.channels) {
            self.capacity_frames
        } else {
            // same storage, different frame width
            self.samples.capacity() / channels
        };

        let needed = self
            .frames_queued
            .checked_add(segment.frames())
            .ok_or(SoundError::Allocation(usize::MAX))?;
        if needed > capacity {
            self.grow(capacity, needed, channels)?;
        } else {
            self.capacity_frames = capacity;
        }

        self.format = Some(format);
        self.samples
            .extend_from_slice(&segment.samples[..segment.frames() * channels]);
        self.frames_queued = needed;
        Ok(())
    }

    /// Doubles capacity until `needed` frames fit.
    fn grow(&mut self, current: usize, needed: usize, channels: usize) -> Result<(), SoundError> {
        let mut new_capacity = current.max(MIN_CAPACITY_FRAMES);
        while new_capacity < needed {
            new_capacity = new_capacity
                .checked_mul(2)
                .ok_or(SoundError::Allocation(needed))?;
        }

        let total_samples = new_capacity
            .checked_mul(channels)
            .ok_or(SoundError::Allocation(new_capacity))?;
        self.samples
            .try_reserve_exact(total_samples - self.samples.len())
            .map_err(|_| SoundError::Allocation(new_capacity))?;

        debug!(
            from = current,
            to = new_capacity,
            "chain buffer grown"
        );
        self.capacity_frames = new_capacity;
        self.growths += 1;
        Ok(())
    }

    /// Drops all queued frames; storage and format are kept.
    pub fn reset(&mut self) {
        self.samples.clear();
        self.frames_queued = 0;
    }

    /// Number of frames waiting to be played.
    pub fn frames_queued(&self) -> usize {
        self.frames_queued
    }

    /// Frames that fit without reallocating.
    pub fn capacity_frames(&self) -> usize {
        self.capacity_frames
    }

    /// Format of the queued frames, if any segment was ever added.
    pub fn format(&self) -> Option<PcmFormat> {
        self.format
    }

    /// Returns true if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.frames_queued == 0
    }

    /// Queued interleaved samples.
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// How many times storage was grown over the chain's lifetime.
    pub fn growths(&self) -> usize {
        self.growths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(sample_rate: u32, channels: u16, frames: usize, value: i16) -> AudioSegment {
        AudioSegment {
            format: PcmFormat::new(sample_rate, channels),
            samples: vec![value; frames * usize::from(channels)],
        }
    }

    #[test]
    fn test_new_chain_is_empty() {
        let chain = AudioChain::new();
        assert!(chain.is_empty());
        assert_eq!(chain.capacity_frames(), 0);
        assert_eq!(chain.format(), None);
    }

    #[test]
    fn test_first_segment_adopts_format() {
        let mut chain = AudioChain::new();
        chain.append(&segment(22050, 2, 10, 1)).unwrap();

        assert_eq!(chain.format(), Some(PcmFormat::new(22050, 2)));
        assert_eq!(chain.frames_queued(), 10);
        assert_eq!(chain.samples().len(), 20);
    }

    #[test]
    fn test_segments_concatenate_in_order() {
        let mut chain = AudioChain::new();
        chain.append(&segment(16000, 1, 3, 1)).unwrap();
        chain.append(&segment(16000, 1, 2, 2)).unwrap();

        assert_eq!(chain.samples(), &[1, 1, 1, 2, 2]);
    }

    #[test]
    fn test_mismatched_format_rejected_and_chain_untouched() {
        let mut chain = AudioChain::new();
        chain.append(&segment(16000, 1, 100, 7)).unwrap();

        let result = chain.append(&segment(8000, 1, 50, 9));

        assert!(matches!(result, Err(SoundError::FormatMismatch { .. })));
        assert_eq!(chain.frames_queued(), 100);
        assert!(chain.samples().iter().all(|&s| s == 7));
        assert_eq!(chain.format(), Some(PcmFormat::new(16000, 1)));
    }

    #[test]
    fn test_capacity_doubles() {
        let mut chain = AudioChain::new();
        chain.append(&segment(8000, 1, MIN_CAPACITY_FRAMES, 0)).unwrap();
        assert_eq!(chain.capacity_frames(), MIN_CAPACITY_FRAMES);

        chain.append(&segment(8000, 1, 1, 0)).unwrap();
        assert_eq!(chain.capacity_frames(), MIN_CAPACITY_FRAMES * 2);

        chain.append(&segment(8000, 1, MIN_CAPACITY_FRAMES * 3, 0)).unwrap();
        assert_eq!(chain.capacity_frames(), MIN_CAPACITY_FRAMES * 8);
        assert_eq!(chain.growths(), 3);
    }

    #[test]
    fn test_many_short_clips_grow_logarithmically() {
        let mut chain = AudioChain::new();
        for _ in 0..1000 {
            chain.append(&segment(16000, 1, 160, 0)).unwrap();
        }
        assert_eq!(chain.frames_queued(), 160_000);
        // 4096 * 2^6 = 262144 >= 160000
        assert_eq!(chain.growths(), 7);
    }

    #[test]
    fn test_reset_keeps_storage() {
        let mut chain = AudioChain::new();
        chain.append(&segment(16000, 1, 5000, 1)).unwrap();
        let capacity = chain.capacity_frames();
        let growths = chain.growths();

        chain.reset();
        assert_eq!(chain.frames_queued(), 0);
        assert_eq!(chain.capacity_frames(), capacity);

        chain.append(&segment(16000, 1, capacity, 2)).unwrap();
        assert_eq!(chain.capacity_frames(), capacity);
        assert_eq!(chain.growths(), growths);
    }

    #[test]
    fn test_reset_allows_new_format() {
        let mut chain = AudioChain::new();
        chain.append(&segment(16000, 1, 10, 1)).unwrap();
        chain.reset();

        chain.append(&segment(8000, 1, 10, 1)).unwrap();
        assert_eq!(chain.format(), Some(PcmFormat::new(8000, 1)));
    }

    #[test]
    fn test_channel_change_recomputes_frame_capacity() {
        let mut chain = AudioChain::new();
        chain.append(&segment(16000, 1, 10, 1)).unwrap();
        let mono_capacity = chain.capacity_frames();
        chain.reset();

        chain.append(&segment(16000, 2, 10, 1)).unwrap();
        assert_eq!(chain.capacity_frames(), mono_capacity / 2);
        assert_eq!(chain.growths(), 1);
    }
}
