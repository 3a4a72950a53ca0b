//! Decoded audio buffer representation.
//!
//! An `AudioBuffer` holds one sample array per channel, all of equal length,
//! at a single sample rate. It is the shape both decoded clips and the mixed
//! composition take.

/// Planar multi-channel audio with `f32` samples nominally in [-1.0, 1.0].
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Samples per second per channel.
    sample_rate: u32,
    /// One sample array per channel. All arrays have the same length.
    channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    /// Creates a buffer from per-channel sample arrays.
    ///
    /// Shorter channels are zero-padded to the length of the longest one so
    /// that every channel always has the same frame count.
    pub fn from_channels(sample_rate: u32, mut channels: Vec<Vec<f32>>) -> Self {
        let frames = channels.iter().map(Vec::len).max().unwrap_or(0);
        for channel in &mut channels {
            channel.resize(frames, 0.0);
        }
        Self {
            sample_rate,
            channels,
        }
    }

    /// Creates a buffer of `frames` zero samples on each of `channel_count` channels.
    pub fn silence(channel_count: usize, sample_rate: u32, frames: usize) -> Self {
        Self {
            sample_rate,
            channels: vec![vec![0.0; frames]; channel_count],
        }
    }

    /// Builds a planar buffer from interleaved samples (L, R, L, R, ...).
    ///
    /// A trailing partial frame is dropped.
    pub fn from_interleaved(sample_rate: u32, channel_count: usize, samples: &[f32]) -> Self {
        if channel_count == 0 {
            return Self::from_channels(sample_rate, Vec::new());
        }
        let frames = samples.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (channel, &sample) in channels.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }
        Self {
            sample_rate,
            channels,
        }
    }

    /// Returns the sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Returns the number of channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Returns the number of frames (samples per channel).
    pub fn frame_count(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Returns the length of the buffer in seconds.
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count() as f64 / self.sample_rate as f64
    }

    /// Returns the samples of one channel, or None if out of range.
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// Returns mutable access to the samples of one channel.
    pub fn channel_mut(&mut self, index: usize) -> Option<&mut [f32]> {
        self.channels.get_mut(index).map(Vec::as_mut_slice)
    }

    /// Returns all channels.
    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Returns the sample at `frame` on `channel`, if both are in range.
    #[inline]
    pub fn sample(&self, channel: usize, frame: usize) -> Option<f32> {
        self.channels.get(channel)?.get(frame).copied()
    }

    /// Returns true if the buffer holds no frames.
    pub fn is_empty(&self) -> bool {
        self.frame_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence() {
        let buffer = AudioBuffer::silence(2, 48_000, 100);
        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.frame_count(), 100);
        assert!(buffer.channels().iter().flatten().all(|&s| s == 0.0));
    }

    #[test]
    fn test_from_channels_pads_short_channels() {
        let buffer = AudioBuffer::from_channels(8, vec![vec![0.1, 0.2, 0.3], vec![0.5]]);
        assert_eq!(buffer.frame_count(), 3);
        assert_eq!(buffer.channel(1).unwrap(), &[0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_from_interleaved() {
        let buffer = AudioBuffer::from_interleaved(4, 2, &[0.1, -0.1, 0.2, -0.2, 0.3]);
        assert_eq!(buffer.frame_count(), 2);
        assert_eq!(buffer.channel(0).unwrap(), &[0.1, 0.2]);
        assert_eq!(buffer.channel(1).unwrap(), &[-0.1, -0.2]);
    }

    #[test]
    fn test_duration() {
        let buffer = AudioBuffer::silence(1, 44_100, 22_050);
        assert!((buffer.duration_seconds() - 0.5).abs() < 1e-9);
        assert_eq!(AudioBuffer::silence(1, 0, 10).duration_seconds(), 0.0);
    }
}
