//! Playback preview of a mixed buffer.
//!
//! Wraps an `AudioBuffer` as a rodio `Source` and plays it on the default
//! output device.

use super::buffer::AudioBuffer;
use anyhow::{Context, Result};
use rodio::{OutputStream, Sink, Source};
use std::sync::Arc;
use std::time::Duration;

/// Audio source that streams a planar buffer as interleaved samples.
pub struct BufferSource {
    /// The buffer being played (shared with the session cache).
    buffer: Arc<AudioBuffer>,
    /// Current frame.
    frame: usize,
    /// Current channel within the frame.
    channel: usize,
}

impl BufferSource {
    pub fn new(buffer: Arc<AudioBuffer>) -> Self {
        Self {
            buffer,
            frame: 0,
            channel: 0,
        }
    }

    fn remaining_samples(&self) -> usize {
        let channels = self.buffer.channel_count();
        let total = self.buffer.frame_count() * channels;
        total.saturating_sub(self.frame * channels + self.channel)
    }
}

impl Iterator for BufferSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        let sample = self.buffer.sample(self.channel, self.frame)?;

        // Interleave: every channel of a frame before moving on
        self.channel += 1;
        if self.channel >= self.buffer.channel_count() {
            self.channel = 0;
            self.frame += 1;
        }

        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining_samples();
        (remaining, Some(remaining))
    }
}

impl Source for BufferSource {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.remaining_samples())
    }

    fn channels(&self) -> u16 {
        self.buffer.channel_count() as u16
    }

    fn sample_rate(&self) -> u32 {
        self.buffer.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_secs_f64(self.buffer.duration_seconds()))
    }
}

/// Plays a buffer on the default output device and blocks until it finishes.
///
/// # Errors
///
/// Returns error if no output device is available.
pub fn play_blocking(buffer: Arc<AudioBuffer>) -> Result<()> {
    let (_stream, stream_handle) =
        OutputStream::try_default().context("Failed to open audio output")?;
    let sink = Sink::try_new(&stream_handle).context("Failed to create playback sink")?;

    tracing::info!(
        seconds = buffer.duration_seconds(),
        channels = buffer.channel_count(),
        "Starting playback"
    );
    sink.append(BufferSource::new(buffer));
    sink.sleep_until_end();
    Ok(())
}
